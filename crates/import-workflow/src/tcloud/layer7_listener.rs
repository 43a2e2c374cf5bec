// Archivo: tcloud/layer7_listener.rs
// Propósito: reglas TCloud para crear listeners de capa 7 y forma de los
// flows de creación (un flow por balanceador, lotes encadenados).
use super::{resolved_lb_id, LookupCache};
use crate::compiler::{chain_batches, FlowPlan};
use crate::config::ImportConfig;
use crate::context::ImportContext;
use crate::errors::{ImportError, Result};
use crate::validator::VendorCapability;
use cloud_providers::{CloudStateReader, Listener, Protocol};
use flow::ActionIdGenerator;
use import_domain::{CreateLayer7ListenerDetail, LockTaskType, ResourceKey};
use indexmap::IndexMap;
use log::error;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const CREATE_LISTENER_FLOW: &str = "load_balancer_create_listener";
pub const CREATE_LISTENER_ACTION: &str = "batch_task_tcloud_create_listener";

#[derive(Debug, Default, Clone, Copy)]
pub struct TCloudLayer7Listener;

impl VendorCapability<CreateLayer7ListenerDetail> for TCloudLayer7Listener {
    fn validate(&self,
                ctx: &ImportContext,
                reader: &dyn CloudStateReader,
                records: Vec<&mut CreateLayer7ListenerDetail>)
                -> Result<()> {
        let scope = ctx.scope();
        let mut listeners: LookupCache<(String, u32), Vec<Listener>> = LookupCache::new("listeners");
        for record in records {
            let Some(port) = record.first_port() else { continue };
            let existing = listeners.get_or_fetch((record.cloud_clb_id.clone(), port), |(lb, port)| {
                                        reader.list_listeners_by_port(&scope, lb, *port)
                                    })?;
            for listener in existing {
                check_existing_listener(record, listener)?;
            }
        }
        Ok(())
    }

    fn build_flows(&self,
                   ctx: &ImportContext,
                   config: &ImportConfig,
                   items: &[(Uuid, &CreateLayer7ListenerDetail)])
                   -> Result<Vec<FlowPlan>> {
        let mut by_lb: IndexMap<String, Vec<(Uuid, &CreateLayer7ListenerDetail)>> = IndexMap::new();
        for (item_id, record) in items {
            by_lb.entry(resolved_lb_id(*record)?).or_default().push((*item_id, *record));
        }

        let mut plans = Vec::with_capacity(by_lb.len());
        for (lb_id, group) in by_lb {
            let mut gen = ActionIdGenerator::default();
            let batches = chain_batches(&group,
                                        config.listener_batch_limit,
                                        &mut gen,
                                        CREATE_LISTENER_ACTION,
                                        config.retry,
                                        |chunk| Ok(listener_payload(ctx, &lb_id, chunk)))?;
            let mut tasks = Vec::with_capacity(batches.len());
            let mut item_actions = Vec::with_capacity(group.len());
            for (task, chunk) in batches {
                item_actions.extend(chunk.iter().map(|(id, _)| (*id, task.action_id.clone())));
                tasks.push(task);
            }
            plans.push(FlowPlan { flow_name: CREATE_LISTENER_FLOW,
                                  lock_key: ResourceKey::load_balancer(lb_id.clone()),
                                  lb_id,
                                  lock_task_type: LockTaskType::CreateListener,
                                  sub_res_type: None,
                                  sub_res_ids: Vec::new(),
                                  tasks,
                                  item_actions });
        }
        Ok(plans)
    }
}

/// Compara el registro con un listener que ya ocupa su puerto.
fn check_existing_listener(record: &mut CreateLayer7ListenerDetail, listener: &Listener) -> Result<()> {
    // UDP puede compartir puerto con HTTP/HTTPS
    if listener.protocol == Protocol::Udp {
        return Ok(());
    }
    record.state.set_existing();
    if listener.sni_switch {
        record.state
              .set_not_executable(format!("el listener {} del puerto {} tiene SNI activado", listener.cloud_id,
                                          listener.port));
    }
    if record.protocol() != Some(listener.protocol) {
        record.state.set_not_executable(format!("el puerto {} ya tiene un listener {} ({})",
                                                listener.port, listener.protocol, listener.cloud_id));
        return Ok(());
    }
    if listener.protocol != Protocol::Https {
        return Ok(());
    }
    let Some(cert) = listener.certificate.as_ref() else {
        error!("listener HTTPS {} del balanceador {} sin certificado", listener.cloud_id, listener.cloud_lb_id);
        return Err(ImportError::InconsistentRemoteState(format!("el listener HTTPS {} no tiene certificado",
                                                                listener.cloud_id)));
    };
    let remote_mode = cert.ssl_mode.as_deref().unwrap_or_default();
    if !remote_mode.eq_ignore_ascii_case(&record.ssl_mode) {
        record.state.set_not_executable(format!("ssl_mode distinto al del listener {}: {}",
                                                listener.cloud_id, remote_mode));
    }
    if cert.ca_cloud_id.as_deref().unwrap_or_default() != record.ca_cloud_id {
        record.state.set_not_executable(format!("ca_cloud_id distinto al del listener {}", listener.cloud_id));
    }
    let remote: BTreeSet<&str> = cert.cert_cloud_ids.iter().map(String::as_str).collect();
    let local: BTreeSet<&str> = record.cert_cloud_ids.iter().map(String::as_str).collect();
    if remote != local {
        record.state.set_not_executable(format!("los certificados no coinciden con los del listener {}",
                                                listener.cloud_id));
    }
    Ok(())
}

fn listener_payload(ctx: &ImportContext, lb_id: &str, chunk: &[(Uuid, &CreateLayer7ListenerDetail)]) -> JsonValue {
    let ids: Vec<String> = chunk.iter().map(|(id, _)| id.to_string()).collect();
    let listeners: Vec<JsonValue> = chunk.iter().map(|(_, r)| listener_entry(ctx, lb_id, r)).collect();
    json!({ "management_detail_ids": ids, "listeners": listeners })
}

fn listener_entry(ctx: &ImportContext, lb_id: &str, record: &CreateLayer7ListenerDetail) -> JsonValue {
    let port = record.first_port().unwrap_or_default();
    let mut certificate = Map::new();
    if !record.ssl_mode.is_empty() {
        certificate.insert("ssl_mode".into(), json!(record.ssl_mode));
    }
    if !record.ca_cloud_id.is_empty() {
        certificate.insert("ca_cloud_id".into(), json!(record.ca_cloud_id));
    }
    certificate.insert("cert_cloud_ids".into(), json!(record.cert_cloud_ids));

    let mut entry = Map::new();
    entry.insert("name".into(), json!(format!("{}-{}", record.protocol, port)));
    entry.insert("bk_biz_id".into(), json!(ctx.bk_biz_id));
    entry.insert("lb_id".into(), json!(lb_id));
    entry.insert("protocol".into(), json!(record.protocol));
    entry.insert("port".into(), json!(port));
    if let Some(end) = record.end_port() {
        entry.insert("end_port".into(), json!(end));
    }
    entry.insert("sni_switch".into(), json!(0));
    entry.insert("certificate".into(), JsonValue::Object(certificate));
    JsonValue::Object(entry)
}
