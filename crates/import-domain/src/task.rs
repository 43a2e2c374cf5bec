// Archivo: task.rs
// Propósito: modelos durables del libro de tareas (Job y TaskItem) y los
// enums que se guardan como texto en la base de datos.
use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use cloud_providers::Vendor;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Genera `as_str`, `Display` y `FromStr` para enums guardados como texto.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::ValidationError(format!("{} desconocido: {}",
                                                                      stringify!($name), other))),
                }
            }
        }
    };
}

/// Origen de la importación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Excel,
    Sops,
}
text_enum!(TaskSource { Excel => "excel", Sops => "sops" });

/// Operaciones de importación soportadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOperation {
    CreateLayer7Listener,
    Layer7ListenerBindRs,
}
text_enum!(TaskOperation {
    CreateLayer7Listener => "create_layer7_listener",
    Layer7ListenerBindRs => "layer7_listener_bind_rs",
});

/// Estado global de un Job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Success,
    Failed,
    Cancel,
}
text_enum!(JobState { Running => "running", Success => "success", Failed => "failed", Cancel => "cancel" });

/// Estado de un TaskItem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskItemState {
    Init,
    Running,
    Success,
    Failed,
    Cancel,
}
text_enum!(TaskItemState {
    Init => "init",
    Running => "running",
    Success => "success",
    Failed => "failed",
    Cancel => "cancel",
});

/// Tipo de recurso remoto afectado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResType {
    LoadBalancer,
    TargetGroup,
}
text_enum!(ResType { LoadBalancer => "load_balancer", TargetGroup => "target_group" });

/// Etiqueta de la operación que retiene un bloqueo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTaskType {
    CreateListener,
    AddRs,
}
text_enum!(LockTaskType { CreateListener => "create_listener", AddRs => "add_rs" });

/// Registro durable de una importación completa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub bk_biz_id: i64,
    pub source: TaskSource,
    pub vendor: Vendor,
    pub account_id: String,
    pub resource: ResType,
    pub operations: Vec<TaskOperation>,
    pub state: JobState,
    pub flow_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Datos para crear un Job. Se crea siempre en `Running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub bk_biz_id: i64,
    pub source: TaskSource,
    pub vendor: Vendor,
    pub account_id: String,
    pub resource: ResType,
    pub operations: Vec<TaskOperation>,
}

/// Seguimiento durable de un registro importado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: Uuid,
    pub job_id: Uuid,
    pub operation: TaskOperation,
    pub state: TaskItemState,
    /// Registro serializado.
    pub param: JsonValue,
    pub flow_id: Option<Uuid>,
    pub action_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Datos para crear un TaskItem en estado `Init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskItem {
    pub job_id: Uuid,
    pub operation: TaskOperation,
    pub param: JsonValue,
}

/// Asignación de flow y acción a un TaskItem ya creado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItemUpdate {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub action_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_roundtrip_through_str() {
        for op in [TaskOperation::CreateLayer7Listener, TaskOperation::Layer7ListenerBindRs] {
            assert_eq!(op.as_str().parse::<TaskOperation>().unwrap(), op);
        }
        assert_eq!("ADD_RS".parse::<LockTaskType>().unwrap(), LockTaskType::AddRs);
        assert!("delete_listener".parse::<TaskOperation>().is_err());
        assert_eq!(serde_json::to_value(ResType::TargetGroup).unwrap(), "target_group");
    }
}
