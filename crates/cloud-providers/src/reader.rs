// Archivo: reader.rs
// Propósito: contrato de lectura del estado vivo. Todas las operaciones son
// idempotentes y sin efectos secundarios; la importación puede repetirlas
// (preview + execute) sin alterar la nube.
use crate::errors::Result;
use crate::models::{Instance, Listener, LoadBalancer, ResourceScope, Target, UrlRule};
use std::collections::HashMap;

/// Lector del estado remoto usado por el validador y el compilador de flows.
pub trait CloudStateReader: Send + Sync {
    /// Resuelve balanceadores por `cloud_id` dentro del ámbito dado. Los ids
    /// que no existen simplemente no aparecen en el mapa resultante.
    fn resolve_load_balancers(&self,
                              scope: &ResourceScope,
                              cloud_ids: &[String])
                              -> Result<HashMap<String, LoadBalancer>>;

    /// Lista los listeners de un balanceador en un puerto concreto.
    fn list_listeners_by_port(&self, scope: &ResourceScope, lb_cloud_id: &str, port: u32) -> Result<Vec<Listener>>;

    /// Busca la regla URL `domain` + `url` de un listener.
    fn find_url_rule(&self,
                     scope: &ResourceScope,
                     lb_cloud_id: &str,
                     listener_cloud_id: &str,
                     domain: &str,
                     url: &str)
                     -> Result<Option<UrlRule>>;

    /// Lista los backends vinculados a un target group.
    fn list_targets(&self, target_group_id: &str) -> Result<Vec<Target>>;

    /// Busca una instancia CVM por su IP privada.
    fn find_instance_by_ip(&self, scope: &ResourceScope, ip: &str) -> Result<Option<Instance>>;
}
