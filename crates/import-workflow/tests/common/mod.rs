#![allow(dead_code)]
//! Montaje compartido por las pruebas de integración: estado de nube,
//! libro de tareas, bloqueos y motor de flows, todo en memoria.

use cloud_providers::{InMemoryCloudState, LoadBalancer, Vendor};
use flow::{FlowEngine, FlowMeta, FlowTask, InMemoryFlowEngine, ShareData, WatchRequest, WATCH_FLOW_NAME};
use import_domain::{InMemoryLedger, InMemoryLockStore, ResourceLockStore, TaskLedgerStore};
use import_workflow::{ImportConfig, ImportContext, ImportDeps, ImportService, ResourceLockCoordinator};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Motor en memoria que además anota cada arranque aceptado.
pub struct StartLog {
  inner: Arc<InMemoryFlowEngine>,
  started: Mutex<Vec<Uuid>>,
}

impl StartLog {
  pub fn started(&self) -> Vec<Uuid> {
    self.started.lock().unwrap().clone()
  }
}

impl FlowEngine for StartLog {
  fn submit_flow(&self, name: &str, tasks: Vec<FlowTask>, share_data: ShareData) -> flow::Result<Uuid> {
    self.inner.submit_flow(name, tasks, share_data)
  }

  fn submit_watch_flow(&self, watch: WatchRequest) -> flow::Result<Uuid> {
    self.inner.submit_watch_flow(watch)
  }

  fn start_flow(&self, flow_id: &Uuid) -> flow::Result<()> {
    self.inner.start_flow(flow_id)?;
    self.started.lock().unwrap().push(*flow_id);
    Ok(())
  }

  fn cancel_flow(&self, flow_id: &Uuid, reason: &str) -> flow::Result<()> {
    self.inner.cancel_flow(flow_id, reason)
  }

  fn get_flow(&self, flow_id: &Uuid) -> flow::Result<FlowMeta> {
    self.inner.get_flow(flow_id)
  }
}

pub struct Harness {
  pub state: Arc<InMemoryCloudState>,
  pub ledger: Arc<InMemoryLedger>,
  pub locks: Arc<InMemoryLockStore>,
  pub engine: Arc<InMemoryFlowEngine>,
  pub starts: Arc<StartLog>,
  pub coordinator: ResourceLockCoordinator,
  pub service: ImportService,
}

impl Harness {
  pub fn new(state: InMemoryCloudState) -> Self {
    Self::with_config(state, ImportConfig::default())
  }

  pub fn with_config(state: InMemoryCloudState, config: ImportConfig) -> Self {
    let state = Arc::new(state);
    let ledger = Arc::new(InMemoryLedger::new());
    let locks = Arc::new(InMemoryLockStore::new());
    let engine = Arc::new(InMemoryFlowEngine::new());
    let lock_store: Arc<dyn ResourceLockStore> = locks.clone();
    let coordinator = ResourceLockCoordinator::new(lock_store);
    let ledger_store: Arc<dyn TaskLedgerStore> = ledger.clone();
    let starts = Arc::new(StartLog { inner: engine.clone(), started: Mutex::new(Vec::new()) });
    let flow_engine: Arc<dyn FlowEngine> = starts.clone();
    let deps = ImportDeps { reader: state.clone(),
                            ledger: ledger_store,
                            locks: coordinator.clone(),
                            engine: flow_engine,
                            config };
    Self { state, ledger, locks, engine, starts, coordinator, service: ImportService::new(deps) }
  }

  /// Flows principales (sin las vigilancias), en orden de envío.
  pub fn main_flows(&self) -> Vec<FlowMeta> {
    self.engine.list_flows().unwrap().into_iter().filter(|f| f.name != WATCH_FLOW_NAME).collect()
  }

  pub fn lock_count(&self) -> usize {
    self.locks.list_locks().unwrap().len()
  }
}

pub fn ctx() -> ImportContext {
  ImportContext { vendor: Vendor::TCloud,
                  bk_biz_id: 100,
                  account_id: "acc-1".into(),
                  region_ids: vec!["ap-guangzhou".into()] }
}

pub fn lb(id: &str, cloud_id: &str, vip: &str) -> LoadBalancer {
  LoadBalancer { id: id.into(),
                 cloud_id: cloud_id.into(),
                 vendor: Vendor::TCloud,
                 account_id: "acc-1".into(),
                 bk_biz_id: 100,
                 region: "ap-guangzhou".into(),
                 domain: String::new(),
                 private_ipv4_addresses: vec![],
                 private_ipv6_addresses: vec![],
                 public_ipv4_addresses: vec![vip.into()],
                 public_ipv6_addresses: vec![] }
}

pub fn row(cells: &[&str]) -> Vec<String> {
  cells.iter().map(|c| c.to_string()).collect()
}

/// Estados de una previsualización JSON, en orden.
pub fn statuses(records: &serde_json::Value) -> Vec<String> {
  records.as_array()
         .unwrap()
         .iter()
         .map(|r| r["status"].as_str().unwrap().to_string())
         .collect()
}
