mod common;

use cloud_providers::{InMemoryCloudState, InstType, Instance, Listener, Protocol, Target, UrlRule};
use common::{ctx, lb, row, statuses, Harness};
use flow::{AcceptAllActions, FlowRunner, FlowState};
use import_domain::{TaskOperation, TaskSource};
use import_workflow::tcloud::{BIND_RS_ACTION, BIND_RS_FLOW};
use import_workflow::ImportConfig;

const OP: TaskOperation = TaskOperation::Layer7ListenerBindRs;

fn rule(url: &str, tg: Option<&str>) -> UrlRule {
  UrlRule { id: format!("rule{}", url),
            cloud_id: format!("loc{}", url),
            cloud_lb_id: "lb-1".into(),
            listener_cloud_id: "lbl-1".into(),
            domain: "www.a.com".into(),
            url: url.into(),
            target_group_id: tg.map(str::to_string) }
}

fn state() -> InMemoryCloudState {
  InMemoryCloudState::new().with_load_balancer(lb("00000a", "lb-1", "1.1.1.1"))
                           .with_listener(Listener { id: "lis-1".into(),
                                                     cloud_id: "lbl-1".into(),
                                                     cloud_lb_id: "lb-1".into(),
                                                     protocol: Protocol::Http,
                                                     port: 80,
                                                     end_port: None,
                                                     sni_switch: false,
                                                     certificate: None })
                           .with_url_rule(rule("/", Some("tg-1")))
                           .with_url_rule(rule("/api", Some("tg-2")))
                           .with_url_rule(rule("/none", None))
                           .with_target(Target { target_group_id: "tg-1".into(),
                                                 ip: "10.0.0.1".into(),
                                                 port: 8080,
                                                 weight: 10,
                                                 inst_type: InstType::Eni })
                           .with_instance(Instance { id: "cvm-5".into(),
                                                     cloud_id: "ins-5".into(),
                                                     name: "web-5".into(),
                                                     private_ipv4_addresses: vec!["10.0.0.5".into()],
                                                     public_ipv4_addresses: vec![],
                                                     cloud_vpc_ids: vec!["vpc-1".into()],
                                                     zone: "ap-guangzhou-3".into() })
}

fn bind(protocol: &str, port: &str, url: &str, inst: &str, ip: &str, weight: &str) -> Vec<String> {
  row(&["1.1.1.1", "lb-1", protocol, port, "www.a.com", url, inst, ip, "8080", weight, "", ""])
}

#[test]
fn live_rules_per_record() {
  let h = Harness::new(state());
  let rows = vec![bind("HTTP", "80", "/", "CVM", "10.0.0.5", "10"),
                  bind("HTTP", "80", "/", "ENI", "10.0.0.1", "10"),
                  bind("HTTP", "80", "/none", "ENI", "10.0.0.9", "10"),
                  bind("HTTP", "80", "/missing", "ENI", "10.0.0.9", "10"),
                  bind("HTTP", "80", "/api", "CVM", "10.0.0.77", "10"),
                  bind("HTTP", "81", "/", "ENI", "10.0.0.9", "10"),
                  bind("HTTPS", "80", "/", "ENI", "10.0.0.8", "10")];
  let preview = h.service.preview(&ctx(), OP, &rows).unwrap();
  assert_eq!(statuses(&preview),
             vec!["executable",
                  "existing",
                  "not_executable",
                  "not_executable",
                  "not_executable",
                  "not_executable",
                  "not_executable"]);
  // puerto 80 consultado una vez, puerto 81 otra
  assert_eq!(h.state.listener_lookups(), 2);
}

#[test]
fn bound_target_with_other_weight_is_rejected() {
  let h = Harness::new(state());
  let preview = h.service.preview(&ctx(), OP, &[bind("HTTP", "80", "/", "ENI", "10.0.0.1", "30")]).unwrap();
  assert_eq!(statuses(&preview), vec!["not_executable"]);
}

#[test]
fn one_chain_per_balancer_across_target_groups() {
  let config = ImportConfig { bind_rs_batch_limit: 2, ..Default::default() };
  let h = Harness::with_config(state(), config);
  let rows = vec![bind("HTTP", "80", "/", "ENI", "10.0.1.1", "10"),
                  bind("HTTP", "80", "/api", "ENI", "10.0.2.1", "10"),
                  bind("HTTP", "80", "/", "ENI", "10.0.1.2", "10"),
                  bind("HTTP", "80", "/", "ENI", "10.0.1.3", "10"),
                  bind("HTTP", "80", "/api", "ENI", "10.0.2.2", "10")];
  let records = h.service.preview(&ctx(), OP, &rows).unwrap();
  // una sola consulta de listener por pasada de validación
  assert_eq!(h.state.listener_lookups(), 1);
  let report = h.service.execute(&ctx(), OP, TaskSource::Sops, records).unwrap();
  assert_eq!(report.executed, 5);
  assert_eq!(h.state.listener_lookups(), 2);

  let flows = h.main_flows();
  assert_eq!(flows.len(), 1);
  assert_eq!(flows[0].name, BIND_RS_FLOW);
  let tasks: Vec<_> = flows[0].tasks.iter().map(|t| &t.task).collect();
  assert_eq!(tasks.len(), 3);
  assert!(tasks.iter().all(|t| t.action_name == BIND_RS_ACTION));
  let ids: Vec<&str> = tasks.iter().map(|t| t.action_id.as_str()).collect();
  assert_eq!(ids, vec!["1", "2", "3"]);
  assert_eq!(tasks[0].depend_on, None);
  assert_eq!(tasks[2].depend_on.as_deref(), Some("2"));

  let tgs: Vec<&str> = tasks.iter().map(|t| t.params["target_group_id"].as_str().unwrap()).collect();
  assert_eq!(tgs, vec!["tg-1", "tg-1", "tg-2"]);
  let sizes: Vec<usize> = tasks.iter().map(|t| t.params["rs_list"].as_array().unwrap().len()).collect();
  assert_eq!(sizes, vec![2, 1, 2]);
  assert_eq!(tasks[0].params["vendor"], "tcloud");
  assert_eq!(tasks[0].params["lb_id"], "00000a");
  assert_eq!(tasks[0].params["management_detail_ids"].as_array().unwrap().len(), 2);

  let watch = h.engine
               .list_flows()
               .unwrap()
               .into_iter()
               .find_map(|f| f.watch)
               .unwrap();
  assert_eq!(watch.flow_id, flows[0].id);
  assert_eq!(watch.res_id, "00000a");
  assert_eq!(watch.sub_res_ids, vec!["tg-1".to_string(), "tg-2".to_string()]);
  assert_eq!(watch.sub_res_type.as_deref(), Some("target_group"));
  assert_eq!(watch.task_type, "add_rs");
}

#[test]
fn cvm_backends_carry_instance_data_and_release_on_finish() {
  let h = Harness::new(state());
  let records = h.service.preview(&ctx(), OP, &[bind("HTTP", "80", "/", "CVM", "10.0.0.5", "10")]).unwrap();
  let report = h.service.execute(&ctx(), OP, TaskSource::Excel, records).unwrap();

  let flows = h.main_flows();
  let rs = &flows[0].tasks[0].task.params["rs_list"][0];
  assert_eq!(rs["cloud_inst_id"], "ins-5");
  assert_eq!(rs["inst_name"], "web-5");
  assert_eq!(rs["zone"], "ap-guangzhou-3");
  assert_eq!(rs["cloud_vpc_ids"][0], "vpc-1");
  assert_eq!(rs["account_id"], "acc-1");
  assert_eq!(h.lock_count(), 1);

  let hook = h.coordinator.release_hook();
  FlowRunner::new(h.engine.clone()).run_until_idle(&AcceptAllActions, &hook).unwrap();
  assert_eq!(h.lock_count(), 0);
  let flow = h.main_flows().into_iter().find(|f| f.id == report.flow_ids[0]).unwrap();
  assert_eq!(flow.state, FlowState::Success);
}
