// Archivo: engine.rs
// Propósito: contrato del motor de ejecución asíncrona (`FlowEngine`) y la
// validación de cadenas de tareas.
//
// Nota: el motor real es un servicio externo con su propio pool de workers.
// Desde el punto de vista del importador el envío es "fire-and-forget": la
// finalización sólo la observa el flow de vigilancia.
use crate::domain::{FlowMeta, FlowTask, ShareData, WatchRequest};
use crate::errors::{FlowError, Result};
use std::collections::HashSet;
use uuid::Uuid;

/// Nombre del flow de vigilancia que libera bloqueos de recursos.
pub const WATCH_FLOW_NAME: &str = "load_balancer_operate_watch";
/// Acción única del flow de vigilancia.
pub const WATCH_ACTION_NAME: &str = "load_balancer_operate_watch";

/// Contrato del motor de flows.
///
/// Los flows principales se crean dormidos (`FlowState::Init`) para que el
/// llamador pueda registrar el bloqueo del recurso antes de que arranquen;
/// `start_flow` los pasa a `Pending`.
pub trait FlowEngine: Send + Sync {
    /// Envía un flow con sus tareas y datos compartidos. Devuelve el id
    /// asignado por el motor. El flow queda en estado `Init`.
    fn submit_flow(&self, name: &str, tasks: Vec<FlowTask>, share_data: ShareData) -> Result<Uuid>;

    /// Envía el flow secundario que vigila a `watch.flow_id`.
    fn submit_watch_flow(&self, watch: WatchRequest) -> Result<Uuid>;

    /// Arranca un flow creado en `Init`.
    fn start_flow(&self, flow_id: &Uuid) -> Result<()>;

    /// Cancela un flow que todavía no terminó.
    fn cancel_flow(&self, flow_id: &Uuid, reason: &str) -> Result<()>;

    /// Consulta el estado de un flow.
    fn get_flow(&self, flow_id: &Uuid) -> Result<FlowMeta>;
}

/// Comprueba que `tasks` forma una o varias cadenas lineales bien formadas:
/// ids únicos, cada dependencia apunta a una tarea anterior y ninguna tarea
/// tiene más de un sucesor.
pub fn validate_linear_chain(tasks: &[FlowTask]) -> Result<()> {
    if tasks.is_empty() {
        return Err(FlowError::InvalidTasks("flow sin tareas".into()));
    }
    let mut seen: HashSet<&str> = HashSet::with_capacity(tasks.len());
    let mut depended: HashSet<&str> = HashSet::new();
    for task in tasks {
        if !task.retry.is_valid() {
            return Err(FlowError::InvalidTasks(format!("acción {}: política de reintentos inválida",
                                                       task.action_id)));
        }
        if let Some(dep) = task.depend_on.as_deref() {
            if !seen.contains(dep) {
                return Err(FlowError::InvalidTasks(format!("acción {} depende de {} que no la precede",
                                                           task.action_id, dep)));
            }
            if !depended.insert(dep) {
                return Err(FlowError::InvalidTasks(format!("acción {} tiene más de un sucesor", dep)));
            }
        }
        if !seen.insert(task.action_id.as_str()) {
            return Err(FlowError::InvalidTasks(format!("acción {} repetida", task.action_id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryPolicy;
    use serde_json::json;

    fn task(id: &str, dep: Option<&str>) -> FlowTask {
        FlowTask { action_id: id.into(),
                   action_name: "noop".into(),
                   params: json!({}),
                   retry: RetryPolicy::default(),
                   depend_on: dep.map(|d| d.to_string()) }
    }

    #[test]
    fn accepts_linear_chain() {
        assert!(validate_linear_chain(&[task("1", None), task("2", Some("1")), task("3", Some("2"))]).is_ok());
    }

    #[test]
    fn rejects_fan_out_and_forward_refs() {
        assert!(validate_linear_chain(&[task("1", None), task("2", Some("1")), task("3", Some("1"))]).is_err());
        assert!(validate_linear_chain(&[task("1", Some("2")), task("2", None)]).is_err());
        assert!(validate_linear_chain(&[task("1", None), task("1", None)]).is_err());
        assert!(validate_linear_chain(&[]).is_err());
    }
}
