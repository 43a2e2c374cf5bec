// Archivo: service.rs
// Propósito: `FlowRunner`, el worker que consume el pool del motor en
// memoria y ejecuta las tareas de cada flow. También define los contratos
// que implementan las capas superiores: `ActionHandler` (la llamada remota
// de cada acción) y `WatchHook` (qué hacer cuando un flow vigilado termina).
use crate::domain::{FlowMeta, FlowState, TaskState, WatchRequest};
use crate::engine::FlowEngine;
use crate::errors::Result;
use crate::stubs::InMemoryFlowEngine;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Ejecuta una acción concreta. Devuelve `Err` con el motivo si la llamada
/// remota falla; el runner reintenta según la política de la tarea.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, action_name: &str, params: &serde_json::Value) -> std::result::Result<(), String>;
}

/// Se invoca cuando el flow observado por una vigilancia alcanza un estado
/// terminal.
pub trait WatchHook: Send + Sync {
    fn on_flow_finished(&self, watch: &WatchRequest, state: FlowState) -> std::result::Result<(), String>;
}

/// Handler que acepta cualquier acción. Útil para demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllActions;

impl ActionHandler for AcceptAllActions {
    fn handle(&self, _action_name: &str, _params: &serde_json::Value) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Resumen de una pasada de `run_until_idle`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Flows de vigilancia que completaron su notificación.
    pub watches_completed: usize,
    /// Items que quedaron en cola (vigilancias de flows que no terminan).
    pub left_pending: usize,
}

/// Worker sin concurrencia para el motor en memoria.
pub struct FlowRunner {
    engine: Arc<InMemoryFlowEngine>,
}

impl FlowRunner {
    pub fn new(engine: Arc<InMemoryFlowEngine>) -> Self {
        Self { engine }
    }

    /// Procesa la cola hasta que no queda trabajo o una ronda completa no
    /// avanza (sólo quedan vigilancias de flows que nunca arrancaron).
    pub fn run_until_idle(&self, actions: &dyn ActionHandler, hook: &dyn WatchHook) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        loop {
            let round = self.engine.pool().len();
            if round == 0 {
                break;
            }
            let mut progressed = false;
            for _ in 0..round {
                let Some(item) = self.engine.pool().claim() else { break };
                let meta = self.engine.get_flow(&item.flow_id)?;
                if meta.state.is_terminal() {
                    // cancelado mientras esperaba en cola
                    progressed = true;
                    continue;
                }
                if let Some(watch) = meta.watch.clone() {
                    let watched = self.engine.get_flow(&watch.flow_id)?;
                    if !watched.state.is_terminal() {
                        self.engine.pool().enqueue(item);
                        continue;
                    }
                    progressed = true;
                    let outcome = hook.on_flow_finished(&watch, watched.state);
                    self.finish_watch(&meta, outcome)?;
                    summary.watches_completed += 1;
                } else {
                    progressed = true;
                    match self.run_flow(meta, actions)? {
                        FlowState::Success => summary.succeeded += 1,
                        _ => summary.failed += 1,
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        summary.left_pending = self.engine.pool().len();
        Ok(summary)
    }

    fn finish_watch(&self, meta: &FlowMeta, outcome: std::result::Result<(), String>) -> Result<()> {
        let (task_state, flow_state, reason) = match outcome {
            Ok(()) => (TaskState::Success, FlowState::Success, None),
            Err(e) => {
                warn!("vigilancia {} falló: {}", meta.id, e);
                (TaskState::Failed, FlowState::Failed, Some(e))
            }
        };
        self.engine.update_flow(&meta.id, |m| {
                       for record in m.tasks.iter_mut() {
                           record.state = task_state;
                           record.attempts += 1;
                           record.reason = reason.clone();
                       }
                       m.state = flow_state;
                       m.reason = reason;
                   })
    }

    /// Ejecuta las tareas en orden. Una tarea cuya dependencia no terminó
    /// con éxito se cancela sin ejecutarse.
    fn run_flow(&self, mut meta: FlowMeta, actions: &dyn ActionHandler) -> Result<FlowState> {
        self.engine.update_flow(&meta.id, |m| m.state = FlowState::Running)?;
        let mut outcomes: HashMap<String, TaskState> = HashMap::new();
        for record in meta.tasks.iter_mut() {
            let blocked = record.task
                                .depend_on
                                .as_ref()
                                .map(|dep| outcomes.get(dep) != Some(&TaskState::Success))
                                .unwrap_or(false);
            if blocked {
                record.state = TaskState::Canceled;
                record.reason = Some("dependencia no completada".into());
            } else {
                while record.attempts < record.task.retry.max_attempts {
                    record.attempts += 1;
                    match actions.handle(&record.task.action_name, &record.task.params) {
                        Ok(()) => {
                            record.state = TaskState::Success;
                            record.reason = None;
                            break;
                        }
                        Err(e) => {
                            debug!("flow {} acción {} intento {}: {}", meta.id, record.task.action_id, record.attempts, e);
                            record.state = TaskState::Failed;
                            record.reason = Some(e);
                        }
                    }
                }
            }
            outcomes.insert(record.task.action_id.clone(), record.state);
        }
        let state = if meta.tasks.iter().all(|r| r.state == TaskState::Success) {
            FlowState::Success
        } else {
            FlowState::Failed
        };
        info!("flow {} ({}) terminó en {}", meta.id, meta.name, state.as_str());
        let tasks = meta.tasks;
        self.engine.update_flow(&meta.id, |m| {
                       m.tasks = tasks;
                       m.state = state;
                   })?;
        Ok(state)
    }
}
