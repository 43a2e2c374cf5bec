use crate::lock::{AcquireOutcome, ResourceFlowLock, ResourceKey};
use crate::task::{Job, JobState, NewJob, NewTaskItem, TaskItem, TaskItemState, TaskItemUpdate};
use crate::DomainError;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Operaciones del libro de tareas (Job + TaskItems).
pub trait TaskLedgerStore: Send + Sync {
    /// Crea un Job en estado `Running` y devuelve su id.
    fn create_job(&self, job: NewJob) -> Result<Uuid, DomainError>;

    /// Crea los TaskItems en estado `Init`. Devuelve los ids creados en el
    /// mismo orden que la entrada.
    fn create_task_items(&self, items: Vec<NewTaskItem>) -> Result<Vec<Uuid>, DomainError>;

    /// Registra la lista de flows de un Job.
    fn update_job_flows(&self, job_id: &Uuid, flow_ids: &[Uuid]) -> Result<(), DomainError>;

    /// Asigna flow y acciones a TaskItems existentes.
    fn update_task_items(&self, updates: &[TaskItemUpdate]) -> Result<(), DomainError>;

    fn delete_job(&self, job_id: &Uuid) -> Result<(), DomainError>;

    fn delete_task_items(&self, ids: &[Uuid]) -> Result<(), DomainError>;

    fn get_job(&self, job_id: &Uuid) -> Result<Option<Job>, DomainError>;

    /// TaskItems de un Job en orden de creación.
    fn list_task_items(&self, job_id: &Uuid) -> Result<Vec<TaskItem>, DomainError>;
}

/// Almacén de bloqueos recurso → flow.
///
/// `try_acquire` debe ser atómico: dos llamadas concurrentes sobre la misma
/// clave nunca devuelven ambas `Acquired`.
pub trait ResourceLockStore: Send + Sync {
    fn try_acquire(&self, lock: ResourceFlowLock) -> Result<AcquireOutcome, DomainError>;

    fn get(&self, key: &ResourceKey) -> Result<Option<ResourceFlowLock>, DomainError>;

    /// Libera el bloqueo sólo si lo retiene `owner`. Devuelve si se borró.
    fn release(&self, key: &ResourceKey, owner: &Uuid) -> Result<bool, DomainError>;

    fn list_locks(&self) -> Result<Vec<ResourceFlowLock>, DomainError>;
}

/// Libro de tareas en memoria para tests y desarrollo.
///
/// Admite fallos inyectados para ejercitar los caminos de compensación.
pub struct InMemoryLedger {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    items: Arc<Mutex<Vec<TaskItem>>>,
    /// Si es > 0, cada `create_task_items` descarta esa cantidad de items.
    drop_on_create: AtomicUsize,
    fail_deletes: AtomicBool,
    fail_updates: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self { jobs: Arc::new(Mutex::new(HashMap::new())),
               items: Arc::new(Mutex::new(Vec::new())),
               drop_on_create: AtomicUsize::new(0),
               fail_deletes: AtomicBool::new(false),
               fail_updates: AtomicBool::new(false) }
    }

    /// Simula un almacén que crea menos filas de las pedidas.
    pub fn drop_items_on_create(&self, n: usize) {
        self.drop_on_create.store(n, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().map(|j| j.len()).unwrap_or(0)
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().map(|i| i.len()).unwrap_or(0)
    }

    // Helper to map poisoned mutex errors into DomainError
    fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
        m.lock()
         .map_err(|e| DomainError::StorageError(format!("Mutex '{}' poisoned: {}", name, e)))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLedgerStore for InMemoryLedger {
    fn create_job(&self, job: NewJob) -> Result<Uuid, DomainError> {
        let id = Uuid::new_v4();
        let job = Job { id,
                        bk_biz_id: job.bk_biz_id,
                        source: job.source,
                        vendor: job.vendor,
                        account_id: job.account_id,
                        resource: job.resource,
                        operations: job.operations,
                        state: JobState::Running,
                        flow_ids: Vec::new(),
                        created_at: Utc::now() };
        self.lock_map(&self.jobs, "jobs")?.insert(id, job);
        Ok(id)
    }

    fn create_task_items(&self, items: Vec<NewTaskItem>) -> Result<Vec<Uuid>, DomainError> {
        let keep = items.len().saturating_sub(self.drop_on_create.load(Ordering::SeqCst));
        let mut stored = self.lock_map(&self.items, "items")?;
        let mut ids = Vec::with_capacity(keep);
        for item in items.into_iter().take(keep) {
            let id = Uuid::new_v4();
            stored.push(TaskItem { id,
                                   job_id: item.job_id,
                                   operation: item.operation,
                                   state: TaskItemState::Init,
                                   param: item.param,
                                   flow_id: None,
                                   action_ids: Vec::new(),
                                   created_at: Utc::now() });
            ids.push(id);
        }
        Ok(ids)
    }

    fn update_job_flows(&self, job_id: &Uuid, flow_ids: &[Uuid]) -> Result<(), DomainError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DomainError::StorageError("update_job_flows falló".into()));
        }
        let mut jobs = self.lock_map(&self.jobs, "jobs")?;
        let job = jobs.get_mut(job_id).ok_or_else(|| DomainError::NotFound(format!("job {}", job_id)))?;
        job.flow_ids = flow_ids.to_vec();
        Ok(())
    }

    fn update_task_items(&self, updates: &[TaskItemUpdate]) -> Result<(), DomainError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DomainError::StorageError("update_task_items falló".into()));
        }
        let mut items = self.lock_map(&self.items, "items")?;
        for update in updates {
            let item = items.iter_mut()
                            .find(|i| i.id == update.id)
                            .ok_or_else(|| DomainError::NotFound(format!("task item {}", update.id)))?;
            item.flow_id = Some(update.flow_id);
            item.action_ids = update.action_ids.clone();
        }
        Ok(())
    }

    fn delete_job(&self, job_id: &Uuid) -> Result<(), DomainError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DomainError::StorageError("delete_job falló".into()));
        }
        self.lock_map(&self.jobs, "jobs")?.remove(job_id);
        Ok(())
    }

    fn delete_task_items(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DomainError::StorageError("delete_task_items falló".into()));
        }
        self.lock_map(&self.items, "items")?.retain(|i| !ids.contains(&i.id));
        Ok(())
    }

    fn get_job(&self, job_id: &Uuid) -> Result<Option<Job>, DomainError> {
        Ok(self.lock_map(&self.jobs, "jobs")?.get(job_id).cloned())
    }

    fn list_task_items(&self, job_id: &Uuid) -> Result<Vec<TaskItem>, DomainError> {
        let items = self.lock_map(&self.items, "items")?;
        Ok(items.iter().filter(|i| &i.job_id == job_id).cloned().collect())
    }
}

/// Bloqueos en memoria sobre `DashMap`; la entrada del mapa hace la
/// comprobación y la inserción de forma atómica.
#[derive(Default)]
pub struct InMemoryLockStore {
    locks: DashMap<ResourceKey, ResourceFlowLock>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }
}

impl ResourceLockStore for InMemoryLockStore {
    fn try_acquire(&self, lock: ResourceFlowLock) -> Result<AcquireOutcome, DomainError> {
        match self.locks.entry(lock.key.clone()) {
            Entry::Occupied(held) => {
                debug!("bloqueo {} ocupado por el flow {}", held.key(), held.get().owner_flow_id);
                Ok(AcquireOutcome::Busy { owner_flow_id: held.get().owner_flow_id })
            }
            Entry::Vacant(slot) => {
                slot.insert(lock);
                Ok(AcquireOutcome::Acquired)
            }
        }
    }

    fn get(&self, key: &ResourceKey) -> Result<Option<ResourceFlowLock>, DomainError> {
        Ok(self.locks.get(key).map(|l| l.value().clone()))
    }

    fn release(&self, key: &ResourceKey, owner: &Uuid) -> Result<bool, DomainError> {
        Ok(self.locks.remove_if(key, |_, l| &l.owner_flow_id == owner).is_some())
    }

    fn list_locks(&self) -> Result<Vec<ResourceFlowLock>, DomainError> {
        Ok(self.locks.iter().map(|l| l.value().clone()).collect())
    }
}
