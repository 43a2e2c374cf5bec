// Archivo: compiler.rs
// Propósito: convertir grupos de TaskItems en flows. Cada grupo se trocea
// en lotes acotados y cada lote es una tarea que depende de la anterior; el
// plan resultante se envía al motor siguiendo el protocolo de arranque:
// enviar dormido → vigilancia → bloqueo atómico para todos los planes, y
// después arrancar.
use crate::errors::{ImportError, Result};
use crate::lock::ResourceLockCoordinator;
use flow::{ActionId, ActionIdGenerator, FlowEngine, FlowTask, RetryPolicy, ShareData, WatchRequest};
use import_domain::{LockTaskType, ResType, ResourceKey};
use log::{error, info, warn};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Flow listo para enviar, con el recurso que debe bloquear.
#[derive(Debug, Clone)]
pub struct FlowPlan {
    pub flow_name: &'static str,
    /// Id interno del balanceador (dato compartido `lb_id`).
    pub lb_id: String,
    pub lock_key: ResourceKey,
    pub lock_task_type: LockTaskType,
    pub sub_res_type: Option<ResType>,
    pub sub_res_ids: Vec<String>,
    pub tasks: Vec<FlowTask>,
    /// TaskItem → acción que lo procesa.
    pub item_actions: Vec<(Uuid, ActionId)>,
}

/// Flow enviado con su vigilancia y su bloqueo.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedFlow {
    pub flow_id: Uuid,
    pub watch_flow_id: Uuid,
    pub lock_key: ResourceKey,
    pub item_actions: Vec<(Uuid, ActionId)>,
}

/// Trocea `items` en lotes de como mucho `limit` elementos y crea una tarea
/// por lote. Los ids salen de `gen`, de modo que cada tarea depende de la
/// emitida justo antes por el mismo generador.
pub fn chain_batches<'t, T, F>(items: &'t [T],
                               limit: usize,
                               gen: &mut ActionIdGenerator,
                               action_name: &str,
                               retry: RetryPolicy,
                               mut payload: F)
                               -> Result<Vec<(FlowTask, &'t [T])>>
    where F: FnMut(&[T]) -> Result<JsonValue>
{
    if limit == 0 {
        return Err(ImportError::Config("límite de lote igual a cero".into()));
    }
    items.chunks(limit)
         .map(|chunk| {
             let (action_id, depend_on) = gen.next_pair();
             let task = FlowTask { action_id,
                                   action_name: action_name.to_string(),
                                   params: payload(chunk)?,
                                   retry,
                                   depend_on };
             Ok((task, chunk))
         })
         .collect()
}

/// Envía planes al motor de flows coordinando los bloqueos.
pub struct FlowCompiler<'a> {
    engine: &'a dyn FlowEngine,
    locks: &'a ResourceLockCoordinator,
}

impl<'a> FlowCompiler<'a> {
    pub fn new(engine: &'a dyn FlowEngine, locks: &'a ResourceLockCoordinator) -> Self {
        Self { engine, locks }
    }

    /// Envía todos los planes en dos fases. Primero cada plan queda enviado
    /// dormido, con su vigilancia y su bloqueo; sólo si todos lo consiguen se
    /// arrancan. Un fallo en la primera fase cancela los flows dormidos de
    /// esta llamada y libera sus bloqueos, sin que ninguno haya arrancado.
    ///
    /// En la segunda fase un arranque fallido antes de que arranque ningún
    /// flow deshace todo igual que la primera fase. Una vez arrancado uno, el
    /// job queda comprometido: el flow que no arranca se cancela, se libera su
    /// bloqueo y se devuelve igualmente para que el libro de tareas lo
    /// registre.
    pub fn submit_all(&self, plans: Vec<FlowPlan>) -> Result<Vec<SubmittedFlow>> {
        let mut prepared: Vec<SubmittedFlow> = Vec::with_capacity(plans.len());
        for plan in plans {
            match self.prepare(plan) {
                Ok(flow) => prepared.push(flow),
                Err(e) => {
                    self.abandon(&prepared, "envío del job abortado");
                    return Err(e);
                }
            }
        }

        for (i, flow) in prepared.iter().enumerate() {
            if let Err(e) = self.engine.start_flow(&flow.flow_id) {
                error!("arranque del flow {} falló: {}", flow.flow_id, e);
                if i == 0 {
                    self.abandon(&prepared, "arranque fallido");
                    return Err(e.into());
                }
                self.abandon(std::slice::from_ref(flow), "arranque fallido");
            }
        }
        Ok(prepared)
    }

    /// Primera fase de un plan: flow dormido, vigilancia y bloqueo. Si algo
    /// falla después de crear el flow dormido, éste se cancela.
    pub fn prepare(&self, plan: FlowPlan) -> Result<SubmittedFlow> {
        let mut share = ShareData::new();
        share.insert("lb_id".to_string(), plan.lb_id.clone());
        let flow_id = match self.engine.submit_flow(plan.flow_name, plan.tasks, share) {
            Ok(id) => id,
            Err(e) => {
                error!("envío del flow {} para {} falló: {}", plan.flow_name, plan.lock_key, e);
                return Err(e.into());
            }
        };
        info!("flow {} ({}) enviado para {}", flow_id, plan.flow_name, plan.lock_key);

        let watch = WatchRequest { flow_id,
                                   res_id: plan.lock_key.res_id.clone(),
                                   res_type: plan.lock_key.res_type.as_str().to_string(),
                                   sub_res_ids: plan.sub_res_ids,
                                   sub_res_type: plan.sub_res_type.map(|t| t.as_str().to_string()),
                                   task_type: plan.lock_task_type.as_str().to_string() };
        let watch_flow_id = match self.engine.submit_watch_flow(watch) {
            Ok(id) => id,
            Err(e) => {
                error!("envío de la vigilancia del flow {} falló: {}", flow_id, e);
                self.cancel_flow(&flow_id, "vigilancia no enviada");
                return Err(e.into());
            }
        };

        if let Err(e) = self.locks.acquire(&plan.lock_key, flow_id, plan.lock_task_type) {
            self.cancel_flow(&flow_id, "recurso ocupado");
            return Err(e);
        }
        Ok(SubmittedFlow { flow_id, watch_flow_id, lock_key: plan.lock_key, item_actions: plan.item_actions })
    }

    /// Cancela flows que siguen dormidos y libera sus bloqueos.
    fn abandon(&self, flows: &[SubmittedFlow], reason: &str) {
        for flow in flows {
            self.cancel_flow(&flow.flow_id, reason);
            if let Err(rel) = self.locks.release(&flow.lock_key, &flow.flow_id) {
                error!("no se pudo liberar {} del flow {}: {}", flow.lock_key, flow.flow_id, rel);
            }
        }
    }

    fn cancel_flow(&self, flow_id: &Uuid, reason: &str) {
        if let Err(e) = self.engine.cancel_flow(flow_id, reason) {
            warn!("no se pudo cancelar el flow {}: {}", flow_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batches_respect_limit_and_chain() {
        let items: Vec<u32> = (0..45).collect();
        let mut gen = ActionIdGenerator::default();
        let out = chain_batches(&items, 20, &mut gen, "act", RetryPolicy::default(), |chunk| {
                      Ok(json!({ "n": chunk.len() }))
                  }).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].0.depend_on, None);
        assert_eq!(out[1].0.depend_on.as_deref(), Some("1"));
        assert_eq!(out[2].0.depend_on.as_deref(), Some("2"));
        assert_eq!(out[2].0.params["n"], 5);
        assert_eq!(out[2].1, &items[40..]);
    }

    #[test]
    fn zero_limit_is_config_error() {
        let mut gen = ActionIdGenerator::default();
        let res = chain_batches(&[1u8], 0, &mut gen, "act", RetryPolicy::default(), |_| Ok(json!({})));
        assert!(matches!(res, Err(ImportError::Config(_))));
    }
}
