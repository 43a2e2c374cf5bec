// Archivo: service.rs
// Propósito: punto de entrada de la importación. Resuelve la operación por
// (proveedor, operación) en cada llamada y expone preview / validate /
// execute sobre JSON, más la consulta del libro de tareas.
use crate::context::ImportContext;
use crate::errors::{ImportError, Result};
use crate::pipeline::{ExecuteReport, ImportDeps, ImportOperation};
use crate::registry::OperationRegistry;
use import_domain::{Job, TaskItem, TaskOperation, TaskSource};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub struct ImportService {
    deps: ImportDeps,
}

impl ImportService {
    pub fn new(deps: ImportDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &ImportDeps {
        &self.deps
    }

    fn operation(&self, ctx: &ImportContext, operation: TaskOperation) -> Result<Box<dyn ImportOperation>> {
        OperationRegistry::build(ctx.vendor, operation, self.deps.clone())
    }

    /// Filas crudas → registros anotados. Sólo lectura.
    pub fn preview(&self, ctx: &ImportContext, operation: TaskOperation, rows: &[Vec<String>]) -> Result<JsonValue> {
        self.operation(ctx, operation)?.preview_json(ctx, rows)
    }

    /// Revalida registros ya previsualizados.
    pub fn validate(&self, ctx: &ImportContext, operation: TaskOperation, records: JsonValue) -> Result<JsonValue> {
        self.operation(ctx, operation)?.validate_json(ctx, records)
    }

    pub fn execute(&self,
                   ctx: &ImportContext,
                   operation: TaskOperation,
                   source: TaskSource,
                   records: JsonValue)
                   -> Result<ExecuteReport> {
        self.operation(ctx, operation)?.execute_json(ctx, source, records)
    }

    /// Job y TaskItems registrados en el libro de tareas.
    pub fn job(&self, job_id: &Uuid) -> Result<(Job, Vec<TaskItem>)> {
        let Some(job) = self.deps.ledger.get_job(job_id)? else {
            return Err(ImportError::ResourceNotFound(format!("job {}", job_id)));
        };
        let items = self.deps.ledger.list_task_items(job_id)?;
        Ok((job, items))
    }
}
