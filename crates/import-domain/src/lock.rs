use crate::task::{LockTaskType, ResType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Clave de bloqueo: (tipo de recurso, id de recurso).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub res_type: ResType,
    pub res_id: String,
}

impl ResourceKey {
    pub fn new(res_type: ResType, res_id: impl Into<String>) -> Self {
        Self { res_type, res_id: res_id.into() }
    }

    pub fn load_balancer(res_id: impl Into<String>) -> Self {
        Self::new(ResType::LoadBalancer, res_id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.res_type, self.res_id)
    }
}

/// Bloqueo de un recurso por un flow sin terminar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFlowLock {
    pub key: ResourceKey,
    pub owner_flow_id: Uuid,
    pub task_type: LockTaskType,
    pub created_at: DateTime<Utc>,
}

impl ResourceFlowLock {
    pub fn new(key: ResourceKey, owner_flow_id: Uuid, task_type: LockTaskType) -> Self {
        Self { key, owner_flow_id, task_type, created_at: Utc::now() }
    }
}

/// Resultado de intentar adquirir un bloqueo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired,
    /// Otro flow ya retiene el recurso.
    Busy { owner_flow_id: Uuid },
}
