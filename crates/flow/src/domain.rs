// Archivo: domain.rs
// Propósito: tipos del modelo de flows asíncronos: tareas por lotes
// (`FlowTask`), política de reintentos, estados y la petición de vigilancia
// (`WatchRequest`) que usa el flow secundario para liberar bloqueos.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identificador de una acción dentro de un flow ("1", "2", ...).
pub type ActionId = String;

/// Datos compartidos por todas las tareas de un flow (p.ej. `lb_id`).
pub type ShareData = BTreeMap<String, String>;

/// Política de reintentos que acompaña a cada tarea.
///
/// El motor reintenta la tarea hasta `max_attempts` veces esperando un
/// tiempo aleatorio dentro de `[min_backoff_ms, max_backoff_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new_with_policy(max_attempts: u32, min_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self { max_attempts, min_backoff_ms, max_backoff_ms }
    }

    /// Una política es válida si permite al menos un intento y la ventana
    /// de espera no está invertida.
    pub fn is_valid(&self) -> bool {
        self.max_attempts >= 1 && self.min_backoff_ms <= self.max_backoff_ms
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new_with_policy(3, 100, 200)
    }
}

/// Unidad de trabajo de un flow: una llamada remota por lotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTask {
    pub action_id: ActionId,
    pub action_name: String,
    pub params: JsonValue,
    pub retry: RetryPolicy,
    /// Predecesor único: las tareas de un grupo forman una cadena lineal.
    pub depend_on: Option<ActionId>,
}

/// Estado de un flow dentro del motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Creado pero dormido: no se ejecuta hasta `start_flow`.
    Init,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Success | FlowState::Failed | FlowState::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Init => "init",
            FlowState::Pending => "pending",
            FlowState::Running => "running",
            FlowState::Success => "success",
            FlowState::Failed => "failed",
            FlowState::Canceled => "canceled",
        }
    }
}

/// Estado de una tarea individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Success,
    Failed,
    Canceled,
}

/// Tarea tal como la guarda el motor, con su progreso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTaskRecord {
    pub task: FlowTask,
    pub state: TaskState,
    pub attempts: u32,
    pub reason: Option<String>,
}

/// Petición de vigilancia: el flow secundario observa `flow_id` y, al
/// terminar éste, notifica para liberar el bloqueo del recurso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRequest {
    pub flow_id: Uuid,
    pub res_id: String,
    pub res_type: String,
    #[serde(default)]
    pub sub_res_ids: Vec<String>,
    #[serde(default)]
    pub sub_res_type: Option<String>,
    pub task_type: String,
}

/// Metadatos y progreso de un flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMeta {
    pub id: Uuid,
    pub name: String,
    pub state: FlowState,
    pub share_data: ShareData,
    pub tasks: Vec<FlowTaskRecord>,
    /// Presente sólo en flows de vigilancia.
    pub watch: Option<WatchRequest>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Item de trabajo reclamable por un worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub flow_id: Uuid,
}

/// Generador de ids de acción consecutivos. Cada llamada devuelve el id
/// actual y el anterior (si existe), listo para encadenar dependencias.
#[derive(Debug, Clone)]
pub struct ActionIdGenerator {
    first: u64,
    next: u64,
}

impl ActionIdGenerator {
    pub fn new(first: u64) -> Self {
        Self { first, next: first }
    }

    pub fn next_pair(&mut self) -> (ActionId, Option<ActionId>) {
        let cur = self.next;
        self.next += 1;
        // el primer id emitido no tiene predecesor
        let prev = if cur > self.first { Some((cur - 1).to_string()) } else { None };
        (cur.to_string(), prev)
    }
}

impl Default for ActionIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_chains_consecutive_ids() {
        let mut gen = ActionIdGenerator::default();
        assert_eq!(gen.next_pair(), ("1".to_string(), None));
        assert_eq!(gen.next_pair(), ("2".to_string(), Some("1".to_string())));
        assert_eq!(gen.next_pair(), ("3".to_string(), Some("2".to_string())));
    }

    #[test]
    fn retry_policy_validity() {
        assert!(RetryPolicy::default().is_valid());
        assert!(!RetryPolicy::new_with_policy(0, 100, 200).is_valid());
        assert!(!RetryPolicy::new_with_policy(3, 300, 200).is_valid());
    }
}
