// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un pool de workers (`InMemoryWorkerPool`) y un motor de flows en
// memoria (`InMemoryFlowEngine`). No son durables y se usan para demos,
// el CLI y pruebas locales; la ejecución la dirige `FlowRunner`.
use crate::domain::{FlowMeta, FlowState, FlowTask, FlowTaskRecord, ShareData, TaskState, WatchRequest, WorkItem};
use crate::engine::{validate_linear_chain, FlowEngine, WATCH_ACTION_NAME, WATCH_FLOW_NAME};
use crate::errors::{FlowError, Result};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Pool simple en memoria para encolar y reclamar `WorkItem`.
///
/// Uso pensado para pruebas locales y ejemplos. No garantiza durabilidad
/// ni comportamiento distribuido.
#[derive(Debug)]
pub struct InMemoryWorkerPool {
    queue: Mutex<VecDeque<WorkItem>>,
}

impl InMemoryWorkerPool {
    /// Crea un nuevo pool de workers en memoria.
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    /// Encola un item de trabajo para ser reclamado por un worker.
    pub fn enqueue(&self, item: WorkItem) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).push_back(item);
    }

    /// Reclama el siguiente item de trabajo disponible, si existe.
    pub fn claim(&self) -> Option<WorkItem> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    /// Número de items pendientes.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Motor de flows en memoria.
///
/// Guarda cada flow con sus tareas y encola en el pool los que pasan a
/// `Pending`. Permite inyectar fallos de envío para probar los caminos de
/// compensación del importador.
pub struct InMemoryFlowEngine {
    /// Flows indexados por id.
    flows: Mutex<HashMap<Uuid, FlowMeta>>,
    /// Orden de creación, para listados estables.
    order: Mutex<Vec<Uuid>>,
    pool: InMemoryWorkerPool,
    /// Envíos de flows principales que se aceptan antes de empezar a fallar.
    submit_budget: Mutex<Option<usize>>,
    /// Si está activo, los flows de vigilancia se rechazan.
    reject_watch: Mutex<bool>,
    /// Arranques que se aceptan antes de empezar a fallar.
    start_budget: Mutex<Option<usize>>,
}

impl InMemoryFlowEngine {
    /// Crea un motor vacío.
    pub fn new() -> Self {
        Self { flows: Mutex::new(HashMap::new()),
               order: Mutex::new(Vec::new()),
               pool: InMemoryWorkerPool::new(),
               submit_budget: Mutex::new(None),
               reject_watch: Mutex::new(false),
               start_budget: Mutex::new(None) }
    }

    /// Acepta `n` envíos más de flows principales y rechaza los siguientes.
    pub fn fail_submissions_after(&self, n: usize) {
        *self.submit_budget.lock().unwrap_or_else(|e| e.into_inner()) = Some(n);
    }

    /// Acepta `n` arranques más y rechaza los siguientes.
    pub fn fail_starts_after(&self, n: usize) {
        *self.start_budget.lock().unwrap_or_else(|e| e.into_inner()) = Some(n);
    }

    /// Rechaza los envíos de flows de vigilancia.
    pub fn reject_watch_flows(&self, reject: bool) {
        *self.reject_watch.lock().unwrap_or_else(|e| e.into_inner()) = reject;
    }

    /// Lista todos los flows en orden de creación.
    pub fn list_flows(&self) -> Result<Vec<FlowMeta>> {
        let order = self.lock(&self.order)?;
        let flows = self.lock(&self.flows)?;
        Ok(order.iter().filter_map(|id| flows.get(id).cloned()).collect())
    }

    /// Pool asociado (usado por `FlowRunner`).
    pub(crate) fn pool(&self) -> &InMemoryWorkerPool {
        &self.pool
    }

    /// Aplica `f` sobre el flow `flow_id` bajo el lock.
    pub(crate) fn update_flow<T>(&self, flow_id: &Uuid, f: impl FnOnce(&mut FlowMeta) -> T) -> Result<T> {
        let mut flows = self.lock(&self.flows)?;
        let meta = flows.get_mut(flow_id).ok_or_else(|| FlowError::NotFound(format!("flow {}", flow_id)))?;
        Ok(f(meta))
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `FlowError::Storage`.
    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, FlowError> {
        m.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    fn insert(&self, meta: FlowMeta) -> Result<Uuid> {
        let id = meta.id;
        self.lock(&self.flows)?.insert(id, meta);
        self.lock(&self.order)?.push(id);
        Ok(id)
    }

    fn consume_submit_budget(&self) -> Result<()> {
        Self::consume(&mut *self.lock(&self.submit_budget)?, "el motor rechazó el flow")
    }

    fn consume(budget: &mut Option<usize>, refusal: &str) -> Result<()> {
        match budget.as_mut() {
            Some(0) => Err(FlowError::Submission(refusal.into())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for InMemoryFlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowEngine for InMemoryFlowEngine {
    fn submit_flow(&self, name: &str, tasks: Vec<FlowTask>, share_data: ShareData) -> Result<Uuid> {
        validate_linear_chain(&tasks)?;
        self.consume_submit_budget()?;
        let meta = FlowMeta { id: Uuid::new_v4(),
                              name: name.to_string(),
                              state: FlowState::Init,
                              share_data,
                              tasks: tasks.into_iter()
                                          .map(|task| FlowTaskRecord { task,
                                                                       state: TaskState::Pending,
                                                                       attempts: 0,
                                                                       reason: None })
                                          .collect(),
                              watch: None,
                              reason: None,
                              created_at: Utc::now() };
        self.insert(meta)
    }

    fn submit_watch_flow(&self, watch: WatchRequest) -> Result<Uuid> {
        if *self.lock(&self.reject_watch)? {
            return Err(FlowError::Submission("el motor rechazó el flow de vigilancia".into()));
        }
        if !self.lock(&self.flows)?.contains_key(&watch.flow_id) {
            return Err(FlowError::NotFound(format!("flow vigilado {}", watch.flow_id)));
        }
        let params = serde_json::to_value(&watch).map_err(|e| FlowError::Submission(e.to_string()))?;
        let task = FlowTask { action_id: "1".into(),
                              action_name: WATCH_ACTION_NAME.into(),
                              params,
                              retry: Default::default(),
                              depend_on: None };
        let meta = FlowMeta { id: Uuid::new_v4(),
                              name: WATCH_FLOW_NAME.into(),
                              state: FlowState::Pending,
                              share_data: ShareData::new(),
                              tasks: vec![FlowTaskRecord { task, state: TaskState::Pending, attempts: 0, reason: None }],
                              watch: Some(watch),
                              reason: None,
                              created_at: Utc::now() };
        let id = self.insert(meta)?;
        self.pool.enqueue(WorkItem { flow_id: id });
        Ok(id)
    }

    fn start_flow(&self, flow_id: &Uuid) -> Result<()> {
        Self::consume(&mut *self.lock(&self.start_budget)?, "el motor rechazó el arranque")?;
        self.update_flow(flow_id, |meta| match meta.state {
                FlowState::Init => {
                    meta.state = FlowState::Pending;
                    Ok(())
                }
                other => Err(FlowError::InvalidState(format!("flow {} en estado {}", meta.id, other.as_str()))),
            })??;
        self.pool.enqueue(WorkItem { flow_id: *flow_id });
        Ok(())
    }

    fn cancel_flow(&self, flow_id: &Uuid, reason: &str) -> Result<()> {
        self.update_flow(flow_id, |meta| {
                if meta.state.is_terminal() {
                    return Err(FlowError::InvalidState(format!("flow {} ya terminó", meta.id)));
                }
                meta.state = FlowState::Canceled;
                meta.reason = Some(reason.to_string());
                for record in meta.tasks.iter_mut().filter(|r| r.state == TaskState::Pending) {
                    record.state = TaskState::Canceled;
                }
                Ok(())
            })?
    }

    fn get_flow(&self, flow_id: &Uuid) -> Result<FlowMeta> {
        let flows = self.lock(&self.flows)?;
        flows.get(flow_id).cloned().ok_or_else(|| FlowError::NotFound(format!("flow {}", flow_id)))
    }
}
