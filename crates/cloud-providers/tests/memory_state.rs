use cloud_providers::{CloudStateReader, InMemoryCloudState, ProviderError, ResourceScope, Vendor};

fn scope() -> ResourceScope {
  ResourceScope { vendor: Vendor::TCloud, account_id: "acc-1".into(), bk_biz_id: 100 }
}

const SNAPSHOT: &str = r#"{
  "load_balancers": [
    { "id": "00000a", "cloud_id": "lb-1", "vendor": "tcloud", "account_id": "acc-1", "bk_biz_id": 100,
      "region": "ap-guangzhou", "public_ipv4_addresses": ["1.1.1.1"] },
    { "id": "00000b", "cloud_id": "lb-2", "vendor": "tcloud", "account_id": "other", "bk_biz_id": 100,
      "region": "ap-guangzhou" }
  ],
  "listeners": [
    { "id": "lis-a", "cloud_id": "lbl-a", "cloud_lb_id": "lb-1", "protocol": "HTTP", "port": 80 }
  ]
}"#;

#[test]
fn snapshot_file_is_loaded_and_scoped() {
  let path = std::env::temp_dir().join(format!("cloud_state_{}.json", std::process::id()));
  std::fs::write(&path, SNAPSHOT).unwrap();
  let state = InMemoryCloudState::load_file(&path).expect("load snapshot");
  let _ = std::fs::remove_file(&path);

  // lb-2 belongs to another account and must not resolve
  let lbs = state.resolve_load_balancers(&scope(), &["lb-1".into(), "lb-2".into()]).unwrap();
  assert_eq!(lbs.len(), 1);
  assert_eq!(lbs["lb-1"].id, "00000a");

  let listeners = state.list_listeners_by_port(&scope(), "lb-1", 80).unwrap();
  assert_eq!(listeners.len(), 1);
  assert!(state.list_listeners_by_port(&scope(), "lb-1", 443).unwrap().is_empty());
  assert_eq!(state.listener_lookups(), 2);
}

#[test]
fn injected_failure_surfaces_as_remote_error() {
  let state = InMemoryCloudState::new();
  state.fail_with("timeout");
  match state.resolve_load_balancers(&scope(), &["lb-1".into()]) {
    Err(ProviderError::Remote(msg)) => assert_eq!(msg, "timeout"),
    other => panic!("expected remote error, got {:?}", other),
  }
}
