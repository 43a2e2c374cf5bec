use crate::errors::{ImportError, Result};
use crate::pipeline::{ImportDeps, ImportOperation, ImportPipeline};
use crate::tcloud::{TCloudBindRs, TCloudLayer7Listener};
use cloud_providers::Vendor;
use import_domain::{CreateLayer7ListenerDetail, Layer7ListenerBindRsDetail, TaskOperation};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Constructor de una operación con sus dependencias ya resueltas.
pub type OperationConstructor = fn(ImportDeps) -> Box<dyn ImportOperation>;

/// Tabla (proveedor, operación) → constructor. Se construye una sola vez y
/// no cambia en tiempo de ejecución.
static REGISTRY: Lazy<HashMap<(Vendor, TaskOperation), OperationConstructor>> = Lazy::new(|| {
  let mut m: HashMap<(Vendor, TaskOperation), OperationConstructor> = HashMap::new();
  m.insert((Vendor::TCloud, TaskOperation::CreateLayer7Listener), tcloud_create_listener);
  m.insert((Vendor::TCloud, TaskOperation::Layer7ListenerBindRs), tcloud_bind_rs);
  m
});

fn tcloud_create_listener(deps: ImportDeps) -> Box<dyn ImportOperation> {
  Box::new(ImportPipeline::<CreateLayer7ListenerDetail>::new(deps, Box::new(TCloudLayer7Listener)))
}

fn tcloud_bind_rs(deps: ImportDeps) -> Box<dyn ImportOperation> {
  Box::new(ImportPipeline::<Layer7ListenerBindRsDetail>::new(deps, Box::new(TCloudBindRs)))
}

/// Fábrica de operaciones de importación.
///
/// Devuelve `UnsupportedOperation` si el proveedor no tiene capacidad para
/// la operación pedida.
pub struct OperationRegistry;
impl OperationRegistry {
  pub fn build(vendor: Vendor, operation: TaskOperation, deps: ImportDeps) -> Result<Box<dyn ImportOperation>> {
    match REGISTRY.get(&(vendor, operation)) {
      Some(ctor) => Ok(ctor(deps)),
      None => Err(ImportError::UnsupportedOperation { vendor: vendor.to_string(),
                                                      operation: operation.to_string() }),
    }
  }

  /// Combinaciones registradas, en orden estable para menús y ayudas.
  pub fn supported() -> Vec<(Vendor, TaskOperation)> {
    let mut out: Vec<_> = REGISTRY.keys().copied().collect();
    out.sort_by_key(|(v, op)| (v.as_str(), op.as_str()));
    out
  }
}
