// Archivo: tcloud/bind_rs.rs
// Propósito: reglas TCloud para vincular RS a reglas URL de capa 7 y forma
// de los flows `target_group_add_rs`: un flow por balanceador, y dentro de
// él una cadena única de lotes agrupados por target group.
use super::{resolved_lb_id, LookupCache};
use crate::compiler::{chain_batches, FlowPlan};
use crate::config::ImportConfig;
use crate::context::ImportContext;
use crate::errors::{ImportError, Result};
use crate::validator::VendorCapability;
use cloud_providers::{CloudStateReader, InstType, Instance, Listener, Protocol, Target, UrlRule};
use flow::ActionIdGenerator;
use import_domain::{Layer7ListenerBindRsDetail, LockTaskType, ResType, ResourceKey};
use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

pub const BIND_RS_FLOW: &str = "target_group_add_rs";
pub const BIND_RS_ACTION: &str = "target_group_add_rs";

type Detail = Layer7ListenerBindRsDetail;
type Group<'r> = Vec<(Uuid, &'r Detail)>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TCloudBindRs;

/// Cachés de una validación: una consulta por clave.
struct Lookups {
    listeners: LookupCache<(String, u32), Vec<Listener>>,
    rules: LookupCache<(String, String, String), Option<UrlRule>>,
    targets: LookupCache<String, Vec<Target>>,
    instances: LookupCache<String, Option<Instance>>,
}

impl VendorCapability<Detail> for TCloudBindRs {
    fn validate(&self, ctx: &ImportContext, reader: &dyn CloudStateReader, records: Vec<&mut Detail>) -> Result<()> {
        let mut lookups = Lookups { listeners: LookupCache::new("listeners"),
                                    rules: LookupCache::new("reglas URL"),
                                    targets: LookupCache::new("targets"),
                                    instances: LookupCache::new("instancias") };
        for record in records {
            check_record(ctx, reader, &mut lookups, record)?;
        }
        Ok(())
    }

    fn build_flows(&self, ctx: &ImportContext, config: &ImportConfig, items: &[(Uuid, &Detail)]) -> Result<Vec<FlowPlan>> {
        let mut by_lb: IndexMap<String, IndexMap<String, Group<'_>>> = IndexMap::new();
        for (item_id, record) in items {
            let Some(tg) = record.target_group_id.clone() else {
                return Err(ImportError::Structural(format!("el RS {}:{:?} no tiene target group resuelto",
                                                           record.rs_ip, record.rs_port)));
            };
            by_lb.entry(resolved_lb_id(*record)?)
                 .or_default()
                 .entry(tg)
                 .or_default()
                 .push((*item_id, *record));
        }

        let mut plans = Vec::with_capacity(by_lb.len());
        for (lb_id, groups) in by_lb {
            // una sola secuencia de ids para todo el flow
            let mut gen = ActionIdGenerator::default();
            let mut tasks = Vec::new();
            let mut item_actions = Vec::new();
            let sub_res_ids: Vec<String> = groups.keys().cloned().collect();
            for (tg, group) in &groups {
                let batches = chain_batches(group,
                                            config.bind_rs_batch_limit,
                                            &mut gen,
                                            BIND_RS_ACTION,
                                            config.retry,
                                            |chunk| Ok(bind_payload(ctx, &lb_id, tg, chunk)))?;
                for (task, chunk) in batches {
                    item_actions.extend(chunk.iter().map(|(id, _)| (*id, task.action_id.clone())));
                    tasks.push(task);
                }
            }
            plans.push(FlowPlan { flow_name: BIND_RS_FLOW,
                                  lock_key: ResourceKey::load_balancer(lb_id.clone()),
                                  lb_id,
                                  lock_task_type: LockTaskType::AddRs,
                                  sub_res_type: Some(ResType::TargetGroup),
                                  sub_res_ids,
                                  tasks,
                                  item_actions });
        }
        Ok(plans)
    }
}

fn check_record(ctx: &ImportContext,
                reader: &dyn CloudStateReader,
                lookups: &mut Lookups,
                record: &mut Detail)
                -> Result<()> {
    let scope = ctx.scope();
    let Some(port) = record.first_port() else { return Ok(()) };

    let listeners = lookups.listeners.get_or_fetch((record.cloud_clb_id.clone(), port), |(lb, port)| {
                                          reader.list_listeners_by_port(&scope, lb, *port)
                                      })?;
    let Some(listener) = listeners.iter().find(|l| l.protocol != Protocol::Udp) else {
        record.state.set_not_executable(format!("no existe listener en el puerto {}", port));
        return Ok(());
    };
    if record.protocol() != Some(listener.protocol) {
        record.state.set_not_executable(format!("el listener {} es {}, no {}",
                                                listener.cloud_id, listener.protocol, record.protocol));
        return Ok(());
    }

    let rule_key = (listener.cloud_id.clone(), record.domain.clone(), record.url_path.clone());
    let rule = lookups.rules.get_or_fetch(rule_key, |(listener_id, domain, url)| {
                                reader.find_url_rule(&scope, &record.cloud_clb_id, listener_id, domain, url)
                            })?;
    let Some(rule) = rule else {
        record.state.set_not_executable(format!("no existe la regla {}{} en el listener {}",
                                                record.domain, record.url_path, listener.cloud_id));
        return Ok(());
    };
    let Some(tg) = rule.target_group_id.clone() else {
        record.state.set_not_executable(format!("la regla {} no tiene target group", rule.cloud_id));
        return Ok(());
    };
    record.target_group_id = Some(tg.clone());

    let targets = lookups.targets.get_or_fetch(tg, |tg| reader.list_targets(tg))?;
    let rs_port = record.first_rs_port();
    if let Some(bound) = targets.iter().find(|t| t.ip == record.rs_ip && Some(t.port) == rs_port) {
        if record.weight == Some(i64::from(bound.weight)) {
            record.state.set_existing();
        } else {
            record.state.set_not_executable(format!("{}:{} ya está vinculado con peso {}",
                                                    bound.ip, bound.port, bound.weight));
        }
    }

    if record.inst_type() == Some(InstType::Cvm) {
        let instance = lookups.instances.get_or_fetch(record.rs_ip.clone(), |ip| {
                                            reader.find_instance_by_ip(&scope, ip)
                                        })?;
        match instance {
            Some(inst) => record.instance = Some(inst.clone()),
            None => record.state.set_not_executable(format!("no existe una CVM con la IP {}", record.rs_ip)),
        }
    }
    Ok(())
}

fn bind_payload(ctx: &ImportContext, lb_id: &str, tg: &str, chunk: &[(Uuid, &Detail)]) -> JsonValue {
    let ids: Vec<String> = chunk.iter().map(|(id, _)| id.to_string()).collect();
    let rs_list: Vec<JsonValue> = chunk.iter().map(|(_, r)| rs_entry(ctx, tg, r)).collect();
    json!({ "vendor": ctx.vendor.as_str(),
            "management_detail_ids": ids,
            "target_group_id": tg,
            "lb_id": lb_id,
            "rs_list": rs_list })
}

fn rs_entry(ctx: &ImportContext, tg: &str, record: &Detail) -> JsonValue {
    let mut entry = Map::new();
    entry.insert("ip".into(), json!(record.rs_ip));
    entry.insert("inst_type".into(), json!(record.inst_type));
    entry.insert("port".into(), json!(record.first_rs_port().unwrap_or_default()));
    entry.insert("weight".into(), json!(record.weight.unwrap_or_default()));
    entry.insert("account_id".into(), json!(ctx.account_id));
    entry.insert("target_group_id".into(), json!(tg));
    match &record.instance {
        Some(inst) => {
            entry.insert("cloud_inst_id".into(), json!(inst.cloud_id));
            entry.insert("inst_name".into(), json!(inst.name));
            entry.insert("private_ip_address".into(), json!(inst.private_ipv4_addresses));
            entry.insert("public_ip_address".into(), json!(inst.public_ipv4_addresses));
            entry.insert("cloud_vpc_ids".into(), json!(inst.cloud_vpc_ids));
            if !inst.zone.is_empty() {
                entry.insert("zone".into(), json!(inst.zone));
            }
        }
        // ENI: sólo se conoce la IP
        None => {
            entry.insert("private_ip_address".into(), json!([record.rs_ip]));
            entry.insert("public_ip_address".into(), json!([]));
            entry.insert("cloud_vpc_ids".into(), json!([]));
        }
    }
    JsonValue::Object(entry)
}
