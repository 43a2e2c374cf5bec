use cloud_providers::Vendor;
use import_domain::{AcquireOutcome, DomainError, JobState, LockTaskType, NewJob, NewTaskItem, ResType,
                    ResourceFlowLock, ResourceKey, ResourceLockStore, TaskItemUpdate, TaskLedgerStore, TaskOperation,
                    TaskSource};
use import_persistence::DieselLedgerRepository;
use serde_json::json;
use uuid::Uuid;

/// Repo sobre un fichero SQLite temporal; se borra al salir.
struct TempDb {
  path: std::path::PathBuf,
  repo: DieselLedgerRepository,
}

impl TempDb {
  fn new() -> Option<Self> {
    // Si el crate se compiló con `pg`, estas pruebas sólo-SQLite se omiten.
    if cfg!(feature = "pg") {
      eprintln!("skipping sqlite-only persistence test because 'pg' feature is enabled");
      return None;
    }
    let path = std::env::temp_dir().join(format!("import_test_{}.db", Uuid::new_v4()));
    let repo = DieselLedgerRepository::new(path.to_str().unwrap()).expect("repo");
    Some(Self { path, repo })
  }
}

impl Drop for TempDb {
  fn drop(&mut self) {
    let _ = std::fs::remove_file(&self.path);
  }
}

fn new_job() -> NewJob {
  NewJob { bk_biz_id: 7,
           source: TaskSource::Excel,
           vendor: Vendor::TCloud,
           account_id: "acc-1".into(),
           resource: ResType::LoadBalancer,
           operations: vec![TaskOperation::Layer7ListenerBindRs] }
}

#[test]
fn diesel_ledger_job_lifecycle() {
  let Some(db) = TempDb::new() else { return };
  let repo = &db.repo;

  let job_id = repo.create_job(new_job()).expect("create job");
  let job = repo.get_job(&job_id).unwrap().expect("job exists");
  assert_eq!(job.state, JobState::Running);
  assert_eq!(job.vendor, Vendor::TCloud);
  assert_eq!(job.operations, vec![TaskOperation::Layer7ListenerBindRs]);

  let items: Vec<NewTaskItem> = (0..3).map(|i| NewTaskItem { job_id,
                                                             operation: TaskOperation::Layer7ListenerBindRs,
                                                             param: json!({ "rs_ip": format!("10.0.0.{}", i) }) })
                                      .collect();
  let ids = repo.create_task_items(items).expect("create items");
  assert_eq!(ids.len(), 3);

  let flow_id = Uuid::new_v4();
  repo.update_task_items(&ids.iter()
                             .map(|id| TaskItemUpdate { id: *id, flow_id, action_ids: vec!["1".into()] })
                             .collect::<Vec<_>>())
      .expect("update items");
  repo.update_job_flows(&job_id, &[flow_id]).expect("update job");

  let stored = repo.list_task_items(&job_id).unwrap();
  assert_eq!(stored.iter().map(|i| i.id).collect::<Vec<_>>(), ids);
  assert!(stored.iter().all(|i| i.flow_id == Some(flow_id)));
  assert_eq!(stored[2].param["rs_ip"], "10.0.0.2");
  assert_eq!(repo.get_job(&job_id).unwrap().unwrap().flow_ids, vec![flow_id]);

  repo.delete_task_items(&ids).unwrap();
  repo.delete_job(&job_id).unwrap();
  assert!(repo.get_job(&job_id).unwrap().is_none());
  assert!(repo.list_task_items(&job_id).unwrap().is_empty());
}

#[test]
fn diesel_update_of_unknown_rows_is_not_found() {
  let Some(db) = TempDb::new() else { return };
  match db.repo.update_job_flows(&Uuid::new_v4(), &[]) {
    Err(DomainError::NotFound(_)) => {}
    other => panic!("expected not found, got {:?}", other),
  }
  match db.repo.update_task_items(&[TaskItemUpdate { id: Uuid::new_v4(), flow_id: Uuid::new_v4(), action_ids: vec![] }]) {
    Err(DomainError::NotFound(_)) => {}
    other => panic!("expected not found, got {:?}", other),
  }
}

#[test]
fn diesel_lock_unique_insert_is_exclusive() {
  let Some(db) = TempDb::new() else { return };
  let repo = &db.repo;
  let key = ResourceKey::new(ResType::LoadBalancer, "lb-1");
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  assert_eq!(repo.try_acquire(ResourceFlowLock::new(key.clone(), a, LockTaskType::CreateListener)).unwrap(),
             AcquireOutcome::Acquired);
  assert_eq!(repo.try_acquire(ResourceFlowLock::new(key.clone(), b, LockTaskType::AddRs)).unwrap(),
             AcquireOutcome::Busy { owner_flow_id: a });
  // otra clave no se ve afectada
  let other = ResourceKey::new(ResType::LoadBalancer, "lb-2");
  assert_eq!(repo.try_acquire(ResourceFlowLock::new(other, b, LockTaskType::AddRs)).unwrap(),
             AcquireOutcome::Acquired);
  assert_eq!(repo.list_locks().unwrap().len(), 2);

  let held = repo.get(&key).unwrap().expect("lock");
  assert_eq!(held.owner_flow_id, a);
  assert_eq!(held.task_type, LockTaskType::CreateListener);

  assert!(!repo.release(&key, &b).unwrap());
  assert!(repo.release(&key, &a).unwrap());
  assert!(repo.get(&key).unwrap().is_none());
  assert_eq!(repo.try_acquire(ResourceFlowLock::new(key, b, LockTaskType::AddRs)).unwrap(),
             AcquireOutcome::Acquired);
}
