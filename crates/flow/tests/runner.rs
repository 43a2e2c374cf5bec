use flow::{ActionHandler, FlowEngine, FlowRunner, FlowState, FlowTask, InMemoryFlowEngine, RetryPolicy, ShareData,
           TaskState, WatchHook, WatchRequest};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn chain(n: usize, retry: RetryPolicy) -> Vec<FlowTask> {
  (1..=n).map(|i| FlowTask { action_id: i.to_string(),
                             action_name: format!("act-{}", i),
                             params: json!({}),
                             retry,
                             depend_on: if i > 1 { Some((i - 1).to_string()) } else { None } })
         .collect()
}

/// Falla las primeras `fail_first` llamadas a la acción indicada.
struct Flaky {
  target: String,
  fail_first: usize,
  calls: AtomicUsize,
}

impl ActionHandler for Flaky {
  fn handle(&self, action_name: &str, _params: &serde_json::Value) -> Result<(), String> {
    if action_name != self.target {
      return Ok(());
    }
    let n = self.calls.fetch_add(1, Ordering::SeqCst);
    if n < self.fail_first { Err(format!("fallo {}", n)) } else { Ok(()) }
  }
}

#[derive(Default)]
struct Recorder {
  seen: Mutex<Vec<(String, FlowState)>>,
}

impl WatchHook for Recorder {
  fn on_flow_finished(&self, watch: &WatchRequest, state: FlowState) -> Result<(), String> {
    self.seen.lock().unwrap().push((watch.res_id.clone(), state));
    Ok(())
  }
}

fn watch_for(id: uuid::Uuid) -> WatchRequest {
  WatchRequest { flow_id: id,
                 res_id: "lb-1".into(),
                 res_type: "load_balancer".into(),
                 sub_res_ids: vec![],
                 sub_res_type: None,
                 task_type: "create_listener".into() }
}

#[test]
fn retries_then_succeeds_and_notifies_watch() {
  let engine = Arc::new(InMemoryFlowEngine::new());
  let id = engine.submit_flow("f", chain(3, RetryPolicy::default()), ShareData::new()).unwrap();
  engine.submit_watch_flow(watch_for(id)).unwrap();
  engine.start_flow(&id).unwrap();

  let actions = Flaky { target: "act-2".into(), fail_first: 2, calls: AtomicUsize::new(0) };
  let hook = Recorder::default();
  let summary = FlowRunner::new(engine.clone()).run_until_idle(&actions, &hook).expect("run");

  assert_eq!(summary.succeeded, 1);
  assert_eq!(summary.watches_completed, 1);
  let meta = engine.get_flow(&id).unwrap();
  assert_eq!(meta.state, FlowState::Success);
  assert_eq!(meta.tasks[1].attempts, 3);
  assert_eq!(hook.seen.lock().unwrap().as_slice(), &[("lb-1".to_string(), FlowState::Success)]);
}

#[test]
fn exhausted_retries_cancel_dependents() {
  let engine = Arc::new(InMemoryFlowEngine::new());
  let id = engine.submit_flow("f", chain(3, RetryPolicy::new_with_policy(2, 1, 1)), ShareData::new()).unwrap();
  engine.start_flow(&id).unwrap();

  let actions = Flaky { target: "act-2".into(), fail_first: 10, calls: AtomicUsize::new(0) };
  let summary = FlowRunner::new(engine.clone()).run_until_idle(&actions, &Recorder::default()).unwrap();
  assert_eq!(summary.failed, 1);

  let meta = engine.get_flow(&id).unwrap();
  assert_eq!(meta.state, FlowState::Failed);
  let states: Vec<TaskState> = meta.tasks.iter().map(|t| t.state).collect();
  assert_eq!(states, vec![TaskState::Success, TaskState::Failed, TaskState::Canceled]);
  assert_eq!(meta.tasks[1].attempts, 2);
  assert_eq!(meta.tasks[2].attempts, 0);
}

#[test]
fn watch_of_dormant_flow_stays_queued() {
  let engine = Arc::new(InMemoryFlowEngine::new());
  let id = engine.submit_flow("f", chain(1, RetryPolicy::default()), ShareData::new()).unwrap();
  engine.submit_watch_flow(watch_for(id)).unwrap();

  let hook = Recorder::default();
  let summary = FlowRunner::new(engine.clone()).run_until_idle(&flow::AcceptAllActions, &hook).unwrap();
  assert_eq!(summary.watches_completed, 0);
  assert_eq!(summary.left_pending, 1);
  assert!(hook.seen.lock().unwrap().is_empty());

  // al cancelar el flow dormido la vigilancia sí observa el final
  engine.cancel_flow(&id, "ocupado").unwrap();
  let summary = FlowRunner::new(engine.clone()).run_until_idle(&flow::AcceptAllActions, &hook).unwrap();
  assert_eq!(summary.watches_completed, 1);
  assert_eq!(hook.seen.lock().unwrap()[0].1, FlowState::Canceled);
}
