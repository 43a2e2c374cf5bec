use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use cloud_providers::{CloudStateReader, InMemoryCloudState, Vendor};
use flow::{AcceptAllActions, FlowEngine, FlowRunner, InMemoryFlowEngine};
use import_domain::{InMemoryLedger, InMemoryLockStore, ResourceLockStore, TaskLedgerStore, TaskOperation, TaskSource};
use import_workflow::{ImportConfig, ImportContext, ImportDeps, ImportService, OperationRegistry,
                      ResourceLockCoordinator};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Menú interactivo de importación masiva.
///
/// El estado de la nube se lee de un snapshot JSON (`IMPORT_CLOUD_SNAPSHOT`),
/// el libro de tareas y los bloqueos de la base de datos (`IMPORT_DB_URL`,
/// en memoria si no está definida) y los flows se ejecutan con el motor en
/// memoria.
///
/// Opciones soportadas:
/// 1) Previsualizar filas (archivo JSON con un array de filas)
/// 2) Revalidar la última previsualización
/// 3) Ejecutar la última previsualización
/// 4) Procesar flows pendientes
/// 5) Ver un job
/// 6) Ver bloqueos
/// 7) Salir
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ImportConfig::from_env()?;
    let reader = load_cloud_state()?;
    let (ledger, lock_store) = open_stores();
    let engine = Arc::new(InMemoryFlowEngine::new());
    let coordinator = ResourceLockCoordinator::new(lock_store.clone());
    let flow_engine: Arc<dyn FlowEngine> = engine.clone();
    let service = ImportService::new(ImportDeps { reader,
                                                  ledger,
                                                  locks: coordinator.clone(),
                                                  engine: flow_engine,
                                                  config });
    let ctx = prompt_context()?;
    info!("importando para la cuenta {} ({})", ctx.account_id, ctx.vendor);

    // última previsualización: operación + registros anotados
    let mut last: Option<(TaskOperation, Value)> = None;

    loop {
        println!("\n== Import CLI ==");
        println!("1) Previsualizar filas");
        println!("2) Revalidar la última previsualización");
        println!("3) Ejecutar la última previsualización");
        println!("4) Procesar flows pendientes");
        println!("5) Ver job");
        println!("6) Ver bloqueos");
        println!("7) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => {
                let Some(operation) = prompt_operation(ctx.vendor)? else { continue };
                let path = prompt("Archivo de filas (JSON): ")?;
                let rows = match read_rows(path.trim()) {
                    Ok(r) => r,
                    Err(e) => {
                        eprintln!("No se pudieron leer las filas: {}", e);
                        continue;
                    }
                };
                match service.preview(&ctx, operation, &rows) {
                    Ok(records) => {
                        print_records(&records);
                        last = Some((operation, records));
                    }
                    Err(e) => eprintln!("Error en la previsualización: {}", e),
                }
            }
            "2" => {
                let Some((operation, records)) = last.take() else {
                    println!("No hay previsualización");
                    continue;
                };
                match service.validate(&ctx, operation, records.clone()) {
                    Ok(again) => {
                        print_records(&again);
                        last = Some((operation, again));
                    }
                    Err(e) => {
                        eprintln!("Error al revalidar: {}", e);
                        last = Some((operation, records));
                    }
                }
            }
            "3" => {
                let Some((operation, records)) = last.clone() else {
                    println!("No hay previsualización");
                    continue;
                };
                let source = match prompt("Origen (excel/sops) [excel]: ")?.trim() {
                    "" => TaskSource::Excel,
                    s => match s.parse::<TaskSource>() {
                        Ok(src) => src,
                        Err(e) => {
                            eprintln!("{}", e);
                            continue;
                        }
                    },
                };
                match service.execute(&ctx, operation, source, records) {
                    Ok(report) => {
                        println!("Job creado: {}", report.job_id);
                        println!("  registros ejecutados: {} (omitidos: {})", report.executed, report.skipped);
                        for id in &report.flow_ids {
                            println!("  flow: {}", id);
                        }
                        last = None;
                    }
                    Err(e) if e.is_busy() => eprintln!("Recurso ocupado, reintente cuando termine el flow: {}", e),
                    Err(e) => eprintln!("Error al ejecutar: {}", e),
                }
            }
            "4" => {
                let hook = coordinator.release_hook();
                match FlowRunner::new(engine.clone()).run_until_idle(&AcceptAllActions, &hook) {
                    Ok(s) => println!("Flows correctos: {}, fallidos: {}, vigilancias: {}, en cola: {}",
                                      s.succeeded, s.failed, s.watches_completed, s.left_pending),
                    Err(e) => eprintln!("Error procesando flows: {}", e),
                }
            }
            "5" => {
                let id_s = prompt("Job id (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => {
                        eprintln!("UUID inválido");
                        continue;
                    }
                };
                match service.job(&id) {
                    Ok((job, items)) => {
                        println!("Job {} [{}] {} / {} ({})", job.id, job.state, job.vendor, job.account_id, job.source);
                        println!("  flows: {:?}", job.flow_ids);
                        println!("ITEM                                 | OPERACIÓN               | FLOW | ACCIONES");
                        println!("---------------------------------------------------------------------------------");
                        for it in items {
                            let flow = it.flow_id.map(|u| u.to_string()).unwrap_or_else(|| "-".into());
                            println!("{} | {} | {} | {:?}", it.id, it.operation, flow, it.action_ids);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo el job: {}", e),
                }
            }
            "6" => match lock_store.list_locks() {
                Ok(locks) if locks.is_empty() => println!("Sin bloqueos"),
                Ok(locks) => {
                    for l in locks {
                        println!("{} → flow {} ({}, desde {})", l.key, l.owner_flow_id, l.task_type, l.created_at);
                    }
                }
                Err(e) => eprintln!("Error listando bloqueos: {}", e),
            },
            "7" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

fn load_cloud_state() -> Result<Arc<dyn CloudStateReader>, Box<dyn Error>> {
    match std::env::var("IMPORT_CLOUD_SNAPSHOT") {
        Ok(path) if !path.trim().is_empty() => Ok(Arc::new(InMemoryCloudState::load_file(path.trim())?)),
        _ => {
            warn!("IMPORT_CLOUD_SNAPSHOT no definida: estado de nube vacío");
            Ok(Arc::new(InMemoryCloudState::new()))
        }
    }
}

/// Libro de tareas y bloqueos: base de datos si hay URL, si no en memoria.
fn open_stores() -> (Arc<dyn TaskLedgerStore>, Arc<dyn ResourceLockStore>) {
    match import_persistence::new_from_env() {
        Ok(repo) => {
            let repo = Arc::new(repo);
            let ledger: Arc<dyn TaskLedgerStore> = repo.clone();
            let locks: Arc<dyn ResourceLockStore> = repo;
            (ledger, locks)
        }
        Err(e) => {
            warn!("persistencia no disponible ({}); se usa el libro de tareas en memoria", e);
            let ledger: Arc<dyn TaskLedgerStore> = Arc::new(InMemoryLedger::new());
            let locks: Arc<dyn ResourceLockStore> = Arc::new(InMemoryLockStore::new());
            (ledger, locks)
        }
    }
}

fn prompt_context() -> Result<ImportContext, Box<dyn Error>> {
    let vendor = match prompt("Proveedor [tcloud]: ")?.trim() {
        "" => Vendor::TCloud,
        s => s.parse::<Vendor>()?,
    };
    let biz = prompt("Negocio (bk_biz_id) [100]: ")?;
    let bk_biz_id = if biz.trim().is_empty() { 100 } else { biz.trim().parse::<i64>()? };
    let account_id = prompt("Cuenta: ")?.trim().to_string();
    let regions = prompt("Regiones autorizadas (separadas por comas): ")?;
    let region_ids = regions.split(',').map(str::trim).filter(|r| !r.is_empty()).map(str::to_string).collect();
    Ok(ImportContext { vendor, bk_biz_id, account_id, region_ids })
}

fn prompt_operation(vendor: Vendor) -> io::Result<Option<TaskOperation>> {
    let ops: Vec<TaskOperation> =
        OperationRegistry::supported().into_iter().filter(|(v, _)| *v == vendor).map(|(_, op)| op).collect();
    if ops.is_empty() {
        println!("El proveedor {} no tiene operaciones de importación", vendor);
        return Ok(None);
    }
    for (i, op) in ops.iter().enumerate() {
        println!("  {}) {}", i + 1, op);
    }
    let s = prompt("Operación: ")?;
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= ops.len() => Ok(Some(ops[n - 1])),
        _ => {
            println!("Operación inválida");
            Ok(None)
        }
    }
}

fn read_rows(path: &str) -> Result<Vec<Vec<String>>, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_records(records: &Value) {
    let Some(list) = records.as_array() else { return };
    println!("\nLÍNEA | ESTADO         | BALANCEADOR     | MENSAJES");
    println!("---------------------------------------------------------------");
    for (i, r) in list.iter().enumerate() {
        let status = r["status"].as_str().unwrap_or("-");
        let lb = r["cloud_clb_id"].as_str().unwrap_or("-");
        let msgs: Vec<&str> = r["validate_result"].as_array()
                                                  .map(|m| m.iter().filter_map(|v| v.as_str()).collect())
                                                  .unwrap_or_default();
        println!("{:>5} | {:<14} | {:<15} | {}", i + 1, status, lb, msgs.join("; "));
    }
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
