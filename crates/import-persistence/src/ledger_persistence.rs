use crate::schema;
use crate::schema::resource_flow_locks::dsl as locks_dsl;
use crate::schema::task_items::dsl as items_dsl;
use crate::schema::task_jobs::dsl as jobs_dsl;
use chrono::{DateTime, Utc};
use cloud_providers::Vendor;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use import_domain::{AcquireOutcome, DomainError, Job, JobState, NewJob, NewTaskItem, ResourceFlowLock, ResourceKey,
                    ResourceLockStore, TaskItem, TaskItemState, TaskItemUpdate, TaskLedgerStore, TaskOperation};
use log::{debug, error};
use std::sync::Arc;
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;
/// Repo Diesel que implementa `TaskLedgerStore` y `ResourceLockStore`.
pub struct DieselLedgerRepository {
  pool: Arc<DbPool>,
}
impl DieselLedgerRepository {
  /// Crea el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<DbConn>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .build(manager)
                              .map_err(|e| DomainError::StorageError(format!("no se pudo crear el pool: {}", e)))?;
    let repo = DieselLedgerRepository { pool: Arc::new(pool) };
    let mut c = repo.conn()?;
    #[cfg(not(feature = "pg"))]
    {
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
    }
    c.run_pending_migrations(MIGRATIONS)
     .map_err(|e| DomainError::StorageError(format!("migraciones: {}", e)))?;
    drop(c);
    Ok(repo)
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.pool.get().map_err(|e| DomainError::StorageError(format!("pool: {}", e)))
  }
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::task_jobs)]
struct JobRow {
  pub id: String,
  pub bk_biz_id: i64,
  pub source: String,
  pub vendor: String,
  pub account_id: String,
  pub resource: String,
  pub operations: String,
  pub state: String,
  pub flow_ids: String,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::task_items)]
struct TaskItemRow {
  pub id: String,
  pub job_id: String,
  pub seq: i64,
  pub operation: String,
  pub state: String,
  pub param: String,
  pub flow_id: Option<String>,
  pub action_ids: String,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::resource_flow_locks)]
struct LockRow {
  pub res_type: String,
  pub res_id: String,
  pub owner_flow_id: String,
  pub task_type: String,
  pub created_at_ts: i64,
}
fn db_err(e: DieselError) -> DomainError {
  match e {
    DieselError::NotFound => DomainError::NotFound("registro".into()),
    other => DomainError::StorageError(format!("db: {}", other)),
  }
}
fn parse_uuid(s: &str) -> Result<Uuid, DomainError> {
  Uuid::parse_str(s).map_err(|e| DomainError::StorageError(format!("uuid inválido '{}': {}", s, e)))
}
fn from_ts(ts: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_millis(ts).unwrap_or_default()
}
impl JobRow {
  fn into_job(self) -> Result<Job, DomainError> {
    let flow_ids: Vec<String> = serde_json::from_str(&self.flow_ids)?;
    Ok(Job { id: parse_uuid(&self.id)?,
             bk_biz_id: self.bk_biz_id,
             source: self.source.parse()?,
             vendor: self.vendor.parse::<Vendor>()?,
             account_id: self.account_id,
             resource: self.resource.parse()?,
             operations: serde_json::from_str::<Vec<TaskOperation>>(&self.operations)?,
             state: self.state.parse::<JobState>()?,
             flow_ids: flow_ids.iter().map(|f| parse_uuid(f)).collect::<Result<_, _>>()?,
             created_at: from_ts(self.created_at_ts) })
  }
}
impl TaskItemRow {
  fn into_item(self) -> Result<TaskItem, DomainError> {
    Ok(TaskItem { id: parse_uuid(&self.id)?,
                  job_id: parse_uuid(&self.job_id)?,
                  operation: self.operation.parse()?,
                  state: self.state.parse::<TaskItemState>()?,
                  param: serde_json::from_str(&self.param)?,
                  flow_id: self.flow_id.as_deref().map(parse_uuid).transpose()?,
                  action_ids: serde_json::from_str(&self.action_ids)?,
                  created_at: from_ts(self.created_at_ts) })
  }
}
impl LockRow {
  fn into_lock(self) -> Result<ResourceFlowLock, DomainError> {
    Ok(ResourceFlowLock { key: ResourceKey::new(self.res_type.parse()?, self.res_id),
                          owner_flow_id: parse_uuid(&self.owner_flow_id)?,
                          task_type: self.task_type.parse()?,
                          created_at: from_ts(self.created_at_ts) })
  }
}
impl TaskLedgerStore for DieselLedgerRepository {
  fn create_job(&self, job: NewJob) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let id = Uuid::new_v4();
    let row = JobRow { id: id.to_string(),
                       bk_biz_id: job.bk_biz_id,
                       source: job.source.as_str().to_string(),
                       vendor: job.vendor.as_str().to_string(),
                       account_id: job.account_id,
                       resource: job.resource.as_str().to_string(),
                       operations: serde_json::to_string(&job.operations)?,
                       state: JobState::Running.as_str().to_string(),
                       flow_ids: "[]".into(),
                       created_at_ts: Utc::now().timestamp_millis() };
    diesel::insert_into(jobs_dsl::task_jobs).values(&row).execute(&mut conn).map_err(db_err)?;
    Ok(id)
  }
  fn create_task_items(&self, items: Vec<NewTaskItem>) -> Result<Vec<Uuid>, DomainError> {
    let mut conn = self.conn()?;
    let now = Utc::now().timestamp_millis();
    let mut ids = Vec::with_capacity(items.len());
    let mut rows = Vec::with_capacity(items.len());
    for (seq, item) in items.into_iter().enumerate() {
      let id = Uuid::new_v4();
      rows.push(TaskItemRow { id: id.to_string(),
                              job_id: item.job_id.to_string(),
                              seq: seq as i64,
                              operation: item.operation.as_str().to_string(),
                              state: TaskItemState::Init.as_str().to_string(),
                              param: serde_json::to_string(&item.param)?,
                              flow_id: None,
                              action_ids: "[]".into(),
                              created_at_ts: now });
      ids.push(id);
    }
    let inserted = conn.transaction::<usize, DieselError, _>(|conn| {
                         let mut n = 0;
                         for row in &rows {
                           n += diesel::insert_into(items_dsl::task_items).values(row).execute(conn)?;
                         }
                         Ok(n)
                       })
                       .map_err(db_err)?;
    if inserted != ids.len() {
      error!("create_task_items: se insertaron {} de {} filas", inserted, ids.len());
      ids.truncate(inserted);
    }
    Ok(ids)
  }
  fn update_job_flows(&self, job_id: &Uuid, flow_ids: &[Uuid]) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let encoded = serde_json::to_string(&flow_ids.iter().map(|f| f.to_string()).collect::<Vec<_>>())?;
    let n = diesel::update(jobs_dsl::task_jobs.filter(jobs_dsl::id.eq(job_id.to_string())))
              .set(jobs_dsl::flow_ids.eq(encoded))
              .execute(&mut conn)
              .map_err(db_err)?;
    if n == 0 {
      return Err(DomainError::NotFound(format!("job {}", job_id)));
    }
    Ok(())
  }
  fn update_task_items(&self, updates: &[TaskItemUpdate]) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let mut encoded = Vec::with_capacity(updates.len());
    for u in updates {
      encoded.push((u.id.to_string(), u.flow_id.to_string(), serde_json::to_string(&u.action_ids)?));
    }
    conn.transaction::<(), DieselError, _>(|conn| {
          for (item_id, flow, actions) in &encoded {
            let n = diesel::update(items_dsl::task_items.filter(items_dsl::id.eq(item_id)))
                      .set((items_dsl::flow_id.eq(Some(flow.clone())), items_dsl::action_ids.eq(actions)))
                      .execute(conn)?;
            if n == 0 {
              return Err(DieselError::NotFound);
            }
          }
          Ok(())
        })
        .map_err(|e| match e {
          DieselError::NotFound => DomainError::NotFound("task item inexistente".into()),
          other => db_err(other),
        })
  }
  fn delete_job(&self, job_id: &Uuid) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    diesel::delete(jobs_dsl::task_jobs.filter(jobs_dsl::id.eq(job_id.to_string()))).execute(&mut conn)
                                                                                    .map_err(db_err)?;
    Ok(())
  }
  fn delete_task_items(&self, ids: &[Uuid]) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let ids: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
    diesel::delete(items_dsl::task_items.filter(items_dsl::id.eq_any(ids))).execute(&mut conn)
                                                                            .map_err(db_err)?;
    Ok(())
  }
  fn get_job(&self, job_id: &Uuid) -> Result<Option<Job>, DomainError> {
    let mut conn = self.conn()?;
    let opt = jobs_dsl::task_jobs.filter(jobs_dsl::id.eq(job_id.to_string()))
                                 .first::<JobRow>(&mut conn)
                                 .optional()
                                 .map_err(db_err)?;
    opt.map(JobRow::into_job).transpose()
  }
  fn list_task_items(&self, job_id: &Uuid) -> Result<Vec<TaskItem>, DomainError> {
    let mut conn = self.conn()?;
    let rows = items_dsl::task_items.filter(items_dsl::job_id.eq(job_id.to_string()))
                                    .order((items_dsl::created_at_ts.asc(), items_dsl::seq.asc()))
                                    .load::<TaskItemRow>(&mut conn)
                                    .map_err(db_err)?;
    rows.into_iter().map(TaskItemRow::into_item).collect()
  }
}
impl ResourceLockStore for DieselLedgerRepository {
  fn try_acquire(&self, lock: ResourceFlowLock) -> Result<AcquireOutcome, DomainError> {
    let mut conn = self.conn()?;
    let row = LockRow { res_type: lock.key.res_type.as_str().to_string(),
                        res_id: lock.key.res_id.clone(),
                        owner_flow_id: lock.owner_flow_id.to_string(),
                        task_type: lock.task_type.as_str().to_string(),
                        created_at_ts: lock.created_at.timestamp_millis() };
    // la clave primaria (res_type, res_id) decide quién gana
    for _ in 0..2 {
      match diesel::insert_into(locks_dsl::resource_flow_locks).values(&row).execute(&mut conn) {
        Ok(_) => return Ok(AcquireOutcome::Acquired),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
          let held = locks_dsl::resource_flow_locks.filter(locks_dsl::res_type.eq(&row.res_type))
                                                   .filter(locks_dsl::res_id.eq(&row.res_id))
                                                   .first::<LockRow>(&mut conn)
                                                   .optional()
                                                   .map_err(db_err)?;
          if let Some(held) = held {
            return Ok(AcquireOutcome::Busy { owner_flow_id: parse_uuid(&held.owner_flow_id)? });
          }
          // liberado entre el insert y la lectura
          debug!("bloqueo {} liberado durante la adquisición, reintentando", lock.key);
        }
        Err(e) => return Err(db_err(e)),
      }
    }
    Err(DomainError::StorageError(format!("no se pudo adquirir el bloqueo {}", lock.key)))
  }
  fn get(&self, key: &ResourceKey) -> Result<Option<ResourceFlowLock>, DomainError> {
    let mut conn = self.conn()?;
    let opt = locks_dsl::resource_flow_locks.filter(locks_dsl::res_type.eq(key.res_type.as_str()))
                                            .filter(locks_dsl::res_id.eq(&key.res_id))
                                            .first::<LockRow>(&mut conn)
                                            .optional()
                                            .map_err(db_err)?;
    opt.map(LockRow::into_lock).transpose()
  }
  fn release(&self, key: &ResourceKey, owner: &Uuid) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let n = diesel::delete(locks_dsl::resource_flow_locks.filter(locks_dsl::res_type.eq(key.res_type.as_str()))
                                                         .filter(locks_dsl::res_id.eq(&key.res_id))
                                                         .filter(locks_dsl::owner_flow_id.eq(owner.to_string())))
              .execute(&mut conn)
              .map_err(db_err)?;
    Ok(n > 0)
  }
  fn list_locks(&self) -> Result<Vec<ResourceFlowLock>, DomainError> {
    let mut conn = self.conn()?;
    let rows = locks_dsl::resource_flow_locks.load::<LockRow>(&mut conn).map_err(db_err)?;
    rows.into_iter().map(LockRow::into_lock).collect()
  }
}
/// Construye el repositorio a partir de `IMPORT_DB_URL` (o `DATABASE_URL`).
#[cfg(feature = "pg")]
pub fn new_from_env() -> Result<DieselLedgerRepository, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("IMPORT_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| {
                                            DomainError::StorageError("IMPORT_DB_URL / DATABASE_URL no definida".into())
                                          })?;
  if !(url.starts_with("postgres") || url.contains('@')) {
    return Err(DomainError::StorageError("import-persistence: IMPORT_DB_URL no parece una URL de Postgres".into()));
  }
  DieselLedgerRepository::new(&url)
}
/// Construye el repositorio a partir de `IMPORT_DB_URL` (o `DATABASE_URL`).
#[cfg(not(feature = "pg"))]
pub fn new_from_env() -> Result<DieselLedgerRepository, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("IMPORT_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| {
                                            DomainError::StorageError("IMPORT_DB_URL / DATABASE_URL no definida".into())
                                          })?;
  if url.starts_with("postgres") {
    return Err(DomainError::StorageError("import-persistence se compiló sin la feature 'pg'; habilítela para usar \
                                          Postgres"
                                                   .into()));
  }
  DieselLedgerRepository::new(&url)
}
