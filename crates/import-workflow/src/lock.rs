// Archivo: lock.rs
// Propósito: exclusión mutua recurso → flow. Antes de enviar un flow se
// comprueba que ningún otro flow sin terminar retiene el recurso; tras el
// envío se registra el bloqueo de forma atómica y el flow de vigilancia lo
// libera cuando el flow principal termina.
use crate::errors::{ImportError, Result};
use flow::{FlowState, WatchHook, WatchRequest};
use import_domain::{AcquireOutcome, LockTaskType, ResType, ResourceFlowLock, ResourceKey, ResourceLockStore};
use log::{debug, error, info};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ResourceLockCoordinator {
    store: Arc<dyn ResourceLockStore>,
}

impl ResourceLockCoordinator {
    pub fn new(store: Arc<dyn ResourceLockStore>) -> Self {
        Self { store }
    }

    /// Falla con `ResourceBusy` si otro flow retiene `key`.
    pub fn ensure_free(&self, key: &ResourceKey) -> Result<()> {
        match self.store.get(key)? {
            Some(held) => {
                error!("recurso {} ocupado por el flow {}", key, held.owner_flow_id);
                Err(ImportError::ResourceBusy { resource: key.to_string(), owner_flow_id: held.owner_flow_id })
            }
            None => Ok(()),
        }
    }

    /// Registra `flow_id` como dueño de `key`.
    pub fn acquire(&self, key: &ResourceKey, flow_id: Uuid, task_type: LockTaskType) -> Result<()> {
        match self.store.try_acquire(ResourceFlowLock::new(key.clone(), flow_id, task_type))? {
            AcquireOutcome::Acquired => {
                debug!("bloqueo {} adquirido por el flow {}", key, flow_id);
                Ok(())
            }
            AcquireOutcome::Busy { owner_flow_id } => {
                error!("recurso {} ocupado por el flow {} al bloquear para {}", key, owner_flow_id, flow_id);
                Err(ImportError::ResourceBusy { resource: key.to_string(), owner_flow_id })
            }
        }
    }

    /// Libera `key` si lo retiene `owner`.
    pub fn release(&self, key: &ResourceKey, owner: &Uuid) -> Result<bool> {
        Ok(self.store.release(key, owner)?)
    }

    /// Hook para el flow de vigilancia.
    pub fn release_hook(&self) -> LockReleaseHook {
        LockReleaseHook { store: self.store.clone() }
    }
}

/// Libera el bloqueo del recurso vigilado cuando el flow principal termina,
/// sea cual sea su resultado.
pub struct LockReleaseHook {
    store: Arc<dyn ResourceLockStore>,
}

impl WatchHook for LockReleaseHook {
    fn on_flow_finished(&self, watch: &WatchRequest, state: FlowState) -> std::result::Result<(), String> {
        let res_type: ResType = watch.res_type.parse().map_err(|e: import_domain::DomainError| e.to_string())?;
        let key = ResourceKey::new(res_type, watch.res_id.clone());
        match self.store.release(&key, &watch.flow_id) {
            Ok(true) => {
                info!("flow {} terminó en {}; bloqueo {} liberado", watch.flow_id, state.as_str(), key);
                Ok(())
            }
            // el bloqueo pertenece a otro flow (o nunca se llegó a tomar)
            Ok(false) => {
                debug!("flow {} no retenía {}", watch.flow_id, key);
                Ok(())
            }
            Err(e) => {
                error!("no se pudo liberar {} del flow {}: {}", key, watch.flow_id, e);
                Err(e.to_string())
            }
        }
    }
}
