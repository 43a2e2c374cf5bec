//! Crate `flow` — contrato del motor de flows asíncronos por lotes
//!
//! Define los tipos de dominio (`FlowTask`, `FlowMeta`, `WatchRequest`), el
//! contrato `FlowEngine` que usa el importador para enviar flows y una
//! implementación en memoria (`InMemoryFlowEngine`) con su worker
//! (`FlowRunner`) para pruebas y el CLI.
//!
//! Diseño resumido:
//! - Los flows principales se crean dormidos (`Init`) y se arrancan de forma
//!   explícita, lo que permite registrar bloqueos antes de ejecutar nada.
//! - Las tareas de un flow forman cadenas lineales (`depend_on`).
//! - Un flow de vigilancia observa a otro y notifica su final vía
//!   `WatchHook`.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::{FlowEngine, InMemoryFlowEngine, FlowTask, RetryPolicy, ShareData};
//! let engine = InMemoryFlowEngine::new();
//! let task = FlowTask { action_id: "1".into(),
//!                       action_name: "noop".into(),
//!                       params: serde_json::json!({}),
//!                       retry: RetryPolicy::default(),
//!                       depend_on: None };
//! let id = engine.submit_flow("demo", vec![task], ShareData::new()).unwrap();
//! engine.start_flow(&id).unwrap();
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod service;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use service::*;
pub use stubs::*;
