//! import-workflow: importación masiva de listeners y RS de balanceadores
//!
//! Convierte filas de una hoja de cálculo en registros tipados, los valida
//! contra el estado vivo de la nube y, al ejecutar, escribe el libro de
//! tareas y envía un flow por balanceador al motor de flows, bloqueando el
//! recurso hasta que el flow termina.
//!
//! Piezas principales:
//! - `normalizer` y `record`: tabla columna → campo y reglas locales.
//! - `dedup` y `validator`: duplicados en el lote y estado remoto; las
//!   reglas de cada proveedor viven en `VendorCapability` (`tcloud`).
//! - `ledger`, `compiler` y `lock`: libro de tareas, lotes encadenados y
//!   protocolo de arranque con bloqueo atómico.
//! - `pipeline`, `registry` y `service`: orquestación y despacho por
//!   (proveedor, operación).
//!
//! Ejemplo rápido (todo en memoria):
//! ```rust
//! use std::sync::Arc;
//! use cloud_providers::{InMemoryCloudState, Vendor};
//! use flow::InMemoryFlowEngine;
//! use import_domain::{InMemoryLedger, InMemoryLockStore, TaskOperation};
//! use import_workflow::{ImportConfig, ImportContext, ImportDeps, ImportService, ResourceLockCoordinator};
//!
//! let deps = ImportDeps { reader: Arc::new(InMemoryCloudState::new()),
//!                         ledger: Arc::new(InMemoryLedger::new()),
//!                         locks: ResourceLockCoordinator::new(Arc::new(InMemoryLockStore::new())),
//!                         engine: Arc::new(InMemoryFlowEngine::new()),
//!                         config: ImportConfig::default() };
//! let ctx = ImportContext { vendor: Vendor::TCloud,
//!                           bk_biz_id: 1,
//!                           account_id: "acc".into(),
//!                           region_ids: vec!["ap-guangzhou".into()] };
//! let service = ImportService::new(deps);
//! let preview = service.preview(&ctx, TaskOperation::CreateLayer7Listener, &[]).unwrap();
//! assert_eq!(preview, serde_json::json!([]));
//! ```
pub mod compiler;
pub mod config;
pub mod context;
pub mod dedup;
pub mod errors;
pub mod ledger;
pub mod lock;
pub mod normalizer;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod service;
pub mod tcloud;
pub mod validator;

pub use compiler::{chain_batches, FlowCompiler, FlowPlan, SubmittedFlow};
pub use config::ImportConfig;
pub use context::ImportContext;
pub use errors::{ImportError, Result};
pub use ledger::{TaskLedgerWriter, WrittenLedger};
pub use lock::{LockReleaseHook, ResourceLockCoordinator};
pub use pipeline::{ExecuteReport, ImportDeps, ImportOperation, ImportPipeline};
pub use record::ImportRecord;
pub use registry::OperationRegistry;
pub use service::ImportService;
pub use validator::{LiveStateValidator, VendorCapability};
