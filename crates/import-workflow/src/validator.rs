// Archivo: validator.rs
// Propósito: validación contra el estado vivo. La parte común (resolver el
// balanceador, región autorizada, VIP/dominio) vive aquí; las reglas de cada
// proveedor se implementan en `VendorCapability`.
use crate::compiler::FlowPlan;
use crate::config::ImportConfig;
use crate::context::ImportContext;
use crate::errors::{ImportError, Result};
use crate::record::ImportRecord;
use cloud_providers::CloudStateReader;
use log::error;
use std::collections::HashSet;
use uuid::Uuid;

/// Capacidad de un proveedor para una operación: validar contra su estado
/// remoto y construir los flows de los registros ejecutables.
pub trait VendorCapability<R: ImportRecord>: Send + Sync {
    /// Aplica las reglas del proveedor. Recibe sólo los registros que
    /// superaron la parte común.
    fn validate(&self, ctx: &ImportContext, reader: &dyn CloudStateReader, records: Vec<&mut R>) -> Result<()>;

    /// Agrupa, trocea y encadena los registros ejecutables (con el id de su
    /// TaskItem) en un plan por recurso bloqueado.
    fn build_flows(&self, ctx: &ImportContext, config: &ImportConfig, items: &[(Uuid, &R)]) -> Result<Vec<FlowPlan>>;
}

/// Parte común de la validación contra el estado vivo.
pub struct LiveStateValidator<'a> {
    ctx: &'a ImportContext,
    reader: &'a dyn CloudStateReader,
}

impl<'a> LiveStateValidator<'a> {
    pub fn new(ctx: &'a ImportContext, reader: &'a dyn CloudStateReader) -> Self {
        Self { ctx, reader }
    }

    /// Resuelve los balanceadores de los registros aún válidos y aplica las
    /// comprobaciones de región y VIP. Devuelve los registros sobre los que
    /// deben correr las reglas del proveedor.
    pub fn check_resources<'r, R: ImportRecord>(&self, records: &'r mut [R]) -> Result<Vec<&'r mut R>> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = records.iter()
                                      .filter(|r| !r.state().is_not_executable())
                                      .map(|r| r.lb_cloud_id().to_string())
                                      .filter(|id| seen.insert(id.clone()))
                                      .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let lbs = match self.reader.resolve_load_balancers(&self.ctx.scope(), &ids) {
            Ok(lbs) => lbs,
            Err(e) => {
                error!("resolver balanceadores {:?}: {}", ids, e);
                return Err(e.into());
            }
        };
        let mut survivors = Vec::new();
        for record in records.iter_mut() {
            if record.state().is_not_executable() {
                continue;
            }
            let Some(lb) = lbs.get(record.lb_cloud_id()) else {
                error!("balanceador {} no encontrado en la cuenta {}", record.lb_cloud_id(), self.ctx.account_id);
                return Err(ImportError::ResourceNotFound(format!("balanceador {}", record.lb_cloud_id())));
            };
            record.set_lb_id(&lb.id);
            if !self.ctx.region_allowed(&lb.region) {
                record.state_mut()
                      .set_not_executable(format!("la región {} del balanceador no está autorizada", lb.region));
                continue;
            }
            if !lb.matches_vip(record.clb_vip_domain()) {
                let msg = format!("'{}' no es un dominio ni una VIP del balanceador {}",
                                  record.clb_vip_domain(),
                                  lb.cloud_id);
                record.state_mut().set_not_executable(msg);
            }
            survivors.push(record);
        }
        Ok(survivors)
    }
}
