use cloud_providers::Vendor;
use flow::validate_linear_chain;
use import_domain::CreateLayer7ListenerDetail;
use import_workflow::tcloud::TCloudLayer7Listener;
use import_workflow::{ImportConfig, ImportContext, VendorCapability};
use proptest::prelude::*;
use uuid::Uuid;

fn record(lb: u8, port: u32) -> CreateLayer7ListenerDetail {
  CreateLayer7ListenerDetail { cloud_clb_id: format!("lb-{}", lb),
                               protocol: "HTTP".into(),
                               listener_port: vec![port],
                               lb_id: Some(format!("0000{}", lb)),
                               ..Default::default() }
}

proptest! {
  #[test]
  fn batches_never_exceed_the_limit(lbs in prop::collection::vec(0u8..4, 1..120), limit in 1usize..30) {
    let records: Vec<CreateLayer7ListenerDetail> =
      lbs.iter().enumerate().map(|(i, lb)| record(*lb, i as u32 + 1)).collect();
    let items: Vec<(Uuid, &CreateLayer7ListenerDetail)> = records.iter().map(|r| (Uuid::new_v4(), r)).collect();
    let ctx = ImportContext { vendor: Vendor::TCloud, bk_biz_id: 1, account_id: "acc".into(), region_ids: vec![] };
    let config = ImportConfig { listener_batch_limit: limit, ..Default::default() };

    let plans = TCloudLayer7Listener.build_flows(&ctx, &config, &items).unwrap();

    let mut distinct = lbs.clone();
    distinct.sort();
    distinct.dedup();
    prop_assert_eq!(plans.len(), distinct.len());

    let mut covered = 0;
    for plan in &plans {
      prop_assert!(validate_linear_chain(&plan.tasks).is_ok());
      for task in &plan.tasks {
        let n = task.params["listeners"].as_array().map(|a| a.len()).unwrap_or(0);
        prop_assert!(n >= 1 && n <= limit);
        prop_assert!(task.params["listeners"].as_array().unwrap().iter().all(|l| l["lb_id"] == plan.lb_id.as_str()));
      }
      covered += plan.item_actions.len();
    }
    prop_assert_eq!(covered, items.len());
  }
}
