use flow::{validate_linear_chain, ActionIdGenerator, FlowTask, RetryPolicy};
use proptest::prelude::*;
use serde_json::json;

fn tasks_from_groups(groups: &[usize]) -> Vec<FlowTask> {
  // varias cadenas independientes con un único generador de ids
  let mut gen = ActionIdGenerator::default();
  let mut out = Vec::new();
  for &size in groups {
    for i in 0..size {
      let (cur, prev) = gen.next_pair();
      out.push(FlowTask { action_id: cur,
                          action_name: "noop".into(),
                          params: json!({}),
                          retry: RetryPolicy::default(),
                          depend_on: if i == 0 { None } else { prev } });
    }
  }
  out
}

proptest! {
  #[test]
  fn generated_chains_are_always_valid(groups in prop::collection::vec(1usize..6, 1..5)) {
    let tasks = tasks_from_groups(&groups);
    prop_assert_eq!(tasks.len(), groups.iter().sum::<usize>());
    prop_assert!(validate_linear_chain(&tasks).is_ok());
    // ids consecutivos desde "1"
    for (i, t) in tasks.iter().enumerate() {
      prop_assert_eq!(t.action_id.clone(), (i + 1).to_string());
    }
    // exactamente una raíz por grupo
    prop_assert_eq!(tasks.iter().filter(|t| t.depend_on.is_none()).count(), groups.len());
  }
}
