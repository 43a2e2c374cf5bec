// Archivo: pipeline.rs
// Propósito: orquestar una operación de importación de extremo a extremo.
//
//   preview:  filas → normalizar → validar (sólo lectura)
//   validate: registros previsualizados → revalidar
//   execute:  revalidar → filtrar ejecutables → libro de tareas →
//             bloqueos → flows → asociar flows al libro
//
// Si la compilación o el envío de flows falla, el libro de tareas se
// compensa borrando lo escrito en esta llamada.
use crate::compiler::{FlowCompiler, SubmittedFlow};
use crate::config::ImportConfig;
use crate::context::ImportContext;
use crate::dedup::mark_duplicates;
use crate::errors::{ImportError, Result};
use crate::ledger::{TaskLedgerWriter, WrittenLedger};
use crate::lock::ResourceLockCoordinator;
use crate::normalizer::normalize_rows;
use crate::record::ImportRecord;
use crate::validator::{LiveStateValidator, VendorCapability};
use cloud_providers::CloudStateReader;
use flow::FlowEngine;
use import_domain::{ResourceKey, TaskLedgerStore, TaskOperation, TaskSource};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Colaboradores externos de una importación.
#[derive(Clone)]
pub struct ImportDeps {
    pub reader: Arc<dyn CloudStateReader>,
    pub ledger: Arc<dyn TaskLedgerStore>,
    pub locks: ResourceLockCoordinator,
    pub engine: Arc<dyn FlowEngine>,
    pub config: ImportConfig,
}

/// Resultado de un `execute` correcto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteReport {
    pub job_id: Uuid,
    pub flow_ids: Vec<Uuid>,
    pub watch_flow_ids: Vec<Uuid>,
    /// Registros escritos en el libro de tareas.
    pub executed: usize,
    /// Registros descartados por `Existing` o `NotExecutable`.
    pub skipped: usize,
}

/// Pipeline tipado de una operación. La capacidad del proveedor se elige al
/// construirlo (ver `registry`).
pub struct ImportPipeline<R: ImportRecord> {
    deps: ImportDeps,
    capability: Box<dyn VendorCapability<R>>,
}

impl<R: ImportRecord> ImportPipeline<R> {
    pub fn new(deps: ImportDeps, capability: Box<dyn VendorCapability<R>>) -> Self {
        Self { deps, capability }
    }

    /// Normaliza y valida filas crudas. No escribe nada.
    pub fn preview(&self, ctx: &ImportContext, rows: &[Vec<String>]) -> Result<Vec<R>> {
        let records = normalize_rows::<R>(rows, R::columns())?;
        self.validate_records(ctx, records)
    }

    /// Vuelve a validar registros: cada estado se reinicia antes de aplicar
    /// reglas locales, duplicados, estado vivo y reglas del proveedor.
    pub fn validate_records(&self, ctx: &ImportContext, mut records: Vec<R>) -> Result<Vec<R>> {
        for r in records.iter_mut() {
            r.state_mut().reset();
            r.canonicalize();
            r.check_local();
        }
        mark_duplicates(&mut records);
        let reader = self.deps.reader.as_ref();
        let survivors = LiveStateValidator::new(ctx, reader).check_resources(&mut records)?;
        self.capability.validate(ctx, reader, survivors)?;
        for r in records.iter_mut() {
            r.state_mut().finish();
        }
        Ok(records)
    }

    /// Ejecuta los registros ejecutables. Devuelve el job creado o un error;
    /// nunca deja un job a medio enviar: ningún flow arranca hasta que todos
    /// están enviados y bloqueados, y un error deshace el libro de tareas.
    pub fn execute(&self, ctx: &ImportContext, source: TaskSource, records: Vec<R>) -> Result<ExecuteReport> {
        let records = self.validate_records(ctx, records)?;
        let total = records.len();
        let executable: Vec<R> = records.into_iter().filter(|r| r.state().is_executable()).collect();
        if executable.is_empty() {
            error!("{}: ninguno de los {} registros es ejecutable", R::OPERATION, total);
            return Err(ImportError::NothingToExecute);
        }

        let writer = TaskLedgerWriter::new(self.deps.ledger.as_ref());
        let written = writer.write(ctx, source, &executable)?;

        let flows = match self.submit(ctx, &written, &executable) {
            Ok(flows) => flows,
            Err(cause) => return Err(self.compensate(&writer, &written, cause)),
        };
        writer.attach_flows(&written, &flows)?;

        info!("job {}: {} registros en {} flows", written.job_id, executable.len(), flows.len());
        Ok(ExecuteReport { job_id: written.job_id,
                           flow_ids: flows.iter().map(|f| f.flow_id).collect(),
                           watch_flow_ids: flows.iter().map(|f| f.watch_flow_id).collect(),
                           executed: executable.len(),
                           skipped: total - executable.len() })
    }

    fn submit(&self, ctx: &ImportContext, written: &WrittenLedger, records: &[R]) -> Result<Vec<SubmittedFlow>> {
        let mut seen = HashSet::new();
        for r in records {
            let Some(lb_id) = r.lb_id() else { continue };
            let key = ResourceKey::load_balancer(lb_id);
            if seen.insert(key.clone()) {
                self.deps.locks.ensure_free(&key)?;
            }
        }

        let items: Vec<(Uuid, &R)> = written.item_ids.iter().copied().zip(records.iter()).collect();
        let plans = self.capability.build_flows(ctx, &self.deps.config, &items)?;
        FlowCompiler::new(self.deps.engine.as_ref(), &self.deps.locks).submit_all(plans)
    }

    fn compensate(&self, writer: &TaskLedgerWriter<'_>, written: &WrittenLedger, cause: ImportError) -> ImportError {
        error!("job {}: fallo al enviar flows, compensando: {}", written.job_id, cause);
        match writer.rollback(written) {
            Ok(()) => cause,
            Err(rb) => {
                error!("job {}: la compensación también falló: {}", written.job_id, rb);
                ImportError::RollbackFailed { job_id: written.job_id, cause: cause.to_string(), rollback: rb.to_string() }
            }
        }
    }
}

/// Fachada sin tipos de una operación, para despachar por
/// (proveedor, operación) y viajar como JSON.
pub trait ImportOperation: Send + Sync {
    fn operation(&self) -> TaskOperation;

    /// Devuelve la lista anotada de registros como array JSON.
    fn preview_json(&self, ctx: &ImportContext, rows: &[Vec<String>]) -> Result<JsonValue>;

    fn validate_json(&self, ctx: &ImportContext, records: JsonValue) -> Result<JsonValue>;

    fn execute_json(&self, ctx: &ImportContext, source: TaskSource, records: JsonValue) -> Result<ExecuteReport>;
}

impl<R: ImportRecord> ImportPipeline<R> {
    fn decode(records: JsonValue) -> Result<Vec<R>> {
        serde_json::from_value(records).map_err(|e| {
                                           ImportError::Structural(format!("registros de {} mal formados: {}",
                                                                           R::OPERATION,
                                                                           e))
                                       })
    }
}

impl<R: ImportRecord> ImportOperation for ImportPipeline<R> {
    fn operation(&self) -> TaskOperation {
        R::OPERATION
    }

    fn preview_json(&self, ctx: &ImportContext, rows: &[Vec<String>]) -> Result<JsonValue> {
        Ok(serde_json::to_value(self.preview(ctx, rows)?)?)
    }

    fn validate_json(&self, ctx: &ImportContext, records: JsonValue) -> Result<JsonValue> {
        let records = Self::decode(records)?;
        Ok(serde_json::to_value(self.validate_records(ctx, records)?)?)
    }

    fn execute_json(&self, ctx: &ImportContext, source: TaskSource, records: JsonValue) -> Result<ExecuteReport> {
        let records = Self::decode(records)?;
        self.execute(ctx, source, records)
    }
}
