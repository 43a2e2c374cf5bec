// Archivo: ledger.rs
// Propósito: escribir el libro de tareas antes de tocar nada remoto y
// mantenerlo coherente: asociar los flows enviados o compensar (borrar) si
// la compilación falla.
use crate::compiler::SubmittedFlow;
use crate::context::ImportContext;
use crate::errors::{ImportError, Result};
use crate::record::ImportRecord;
use import_domain::{NewJob, NewTaskItem, ResType, TaskItemUpdate, TaskLedgerStore, TaskSource};
use log::{error, info};
use uuid::Uuid;

/// Job y TaskItems creados para una ejecución.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenLedger {
    pub job_id: Uuid,
    /// Un id por registro, en el mismo orden.
    pub item_ids: Vec<Uuid>,
}

pub struct TaskLedgerWriter<'a> {
    store: &'a dyn TaskLedgerStore,
}

impl<'a> TaskLedgerWriter<'a> {
    pub fn new(store: &'a dyn TaskLedgerStore) -> Self {
        Self { store }
    }

    /// Crea el Job (`Running`) y un TaskItem (`Init`) por registro.
    pub fn write<R: ImportRecord>(&self, ctx: &ImportContext, source: TaskSource, records: &[R])
                                  -> Result<WrittenLedger> {
        let new_job = NewJob { bk_biz_id: ctx.bk_biz_id,
                               source,
                               vendor: ctx.vendor,
                               account_id: ctx.account_id.clone(),
                               resource: ResType::LoadBalancer,
                               operations: vec![R::OPERATION] };
        let job_id = match self.store.create_job(new_job) {
            Ok(id) => id,
            Err(e) => {
                error!("crear job para {} falló: {}", R::OPERATION, e);
                return Err(e.into());
            }
        };
        info!("job {} creado ({} registros de {})", job_id, records.len(), R::OPERATION);

        let mut items = Vec::with_capacity(records.len());
        for r in records {
            match serde_json::to_value(r) {
                Ok(param) => items.push(NewTaskItem { job_id, operation: R::OPERATION, param }),
                Err(e) => {
                    self.discard_job(&job_id, &[]);
                    return Err(e.into());
                }
            }
        }
        let item_ids = match self.store.create_task_items(items) {
            Ok(ids) => ids,
            Err(e) => {
                error!("crear task items del job {} falló: {}", job_id, e);
                self.discard_job(&job_id, &[]);
                return Err(e.into());
            }
        };
        if item_ids.len() != records.len() {
            error!("job {}: se pidieron {} task items y se crearon {}", job_id, records.len(), item_ids.len());
            self.discard_job(&job_id, &item_ids);
            return Err(ImportError::LedgerMismatch { expected: records.len(), created: item_ids.len() });
        }
        Ok(WrittenLedger { job_id, item_ids })
    }

    /// Registra en el Job y en cada TaskItem el flow y la acción asignados.
    pub fn attach_flows(&self, written: &WrittenLedger, flows: &[SubmittedFlow]) -> Result<()> {
        let mut updates = Vec::new();
        for f in flows {
            for (item, action) in &f.item_actions {
                updates.push(TaskItemUpdate { id: *item, flow_id: f.flow_id, action_ids: vec![action.clone()] });
            }
        }
        let flow_ids: Vec<Uuid> = flows.iter().map(|f| f.flow_id).collect();
        if let Err(e) = self.store.update_task_items(&updates) {
            error!("asociar flows a los items del job {} falló: {}", written.job_id, e);
            return Err(e.into());
        }
        if let Err(e) = self.store.update_job_flows(&written.job_id, &flow_ids) {
            error!("asociar flows {:?} al job {} falló: {}", flow_ids, written.job_id, e);
            return Err(e.into());
        }
        info!("job {} asociado a {} flows", written.job_id, flow_ids.len());
        Ok(())
    }

    /// Compensación: borra los TaskItems y el Job creados.
    pub fn rollback(&self, written: &WrittenLedger) -> Result<()> {
        self.store.delete_task_items(&written.item_ids)?;
        self.store.delete_job(&written.job_id)?;
        info!("job {} compensado ({} items borrados)", written.job_id, written.item_ids.len());
        Ok(())
    }

    fn discard_job(&self, job_id: &Uuid, item_ids: &[Uuid]) {
        if !item_ids.is_empty() {
            if let Err(e) = self.store.delete_task_items(item_ids) {
                error!("no se pudieron borrar los items del job {}: {}", job_id, e);
            }
        }
        if let Err(e) = self.store.delete_job(job_id) {
            error!("no se pudo borrar el job {}: {}", job_id, e);
        }
    }
}
