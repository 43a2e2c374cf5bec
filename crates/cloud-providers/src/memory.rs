// Archivo: memory.rs
// Propósito: implementación en memoria de `CloudStateReader` para pruebas,
// demos y el CLI. Puede construirse por código o cargarse desde un snapshot
// JSON exportado del inventario.
use crate::errors::{ProviderError, Result};
use crate::models::{Instance, Listener, LoadBalancer, ResourceScope, Target, UrlRule};
use crate::reader::CloudStateReader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Volcado serializable del estado de la nube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudStateSnapshot {
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub url_rules: Vec<UrlRule>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// Estado de nube en memoria. No es durable.
///
/// Lleva la cuenta de las consultas de listeners para poder comprobar en
/// pruebas que la validación no repite llamadas remotas por clave.
pub struct InMemoryCloudState {
    state: Mutex<CloudStateSnapshot>,
    /// Si está presente, todas las consultas fallan con este mensaje.
    failure: Mutex<Option<String>>,
    listener_lookups: AtomicUsize,
}

impl InMemoryCloudState {
    pub fn new() -> Self {
        Self::from_snapshot(CloudStateSnapshot::default())
    }

    pub fn from_snapshot(snapshot: CloudStateSnapshot) -> Self {
        Self { state: Mutex::new(snapshot),
               failure: Mutex::new(None),
               listener_lookups: AtomicUsize::new(0) }
    }

    /// Carga un snapshot JSON desde disco.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: CloudStateSnapshot = serde_json::from_str(&raw)?;
        log::info!("snapshot de nube cargado: {} balanceadores, {} listeners",
                   snapshot.load_balancers.len(),
                   snapshot.listeners.len());
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn with_load_balancer(self, lb: LoadBalancer) -> Self {
        self.guard().load_balancers.push(lb);
        self
    }

    pub fn with_listener(self, listener: Listener) -> Self {
        self.guard().listeners.push(listener);
        self
    }

    pub fn with_url_rule(self, rule: UrlRule) -> Self {
        self.guard().url_rules.push(rule);
        self
    }

    pub fn with_target(self, target: Target) -> Self {
        self.guard().targets.push(target);
        self
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        self.guard().instances.push(instance);
        self
    }

    /// Reemplaza el estado completo (por ejemplo al recargar un snapshot).
    pub fn replace(&self, snapshot: CloudStateSnapshot) {
        *self.guard() = snapshot;
    }

    /// Hace que todas las consultas posteriores fallen con `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Número de consultas `list_listeners_by_port` recibidas.
    pub fn listener_lookups(&self) -> usize {
        self.listener_lookups.load(Ordering::SeqCst)
    }

    fn guard(&self) -> MutexGuard<'_, CloudStateSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(msg) => Err(ProviderError::Remote(msg.clone())),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryCloudState {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudStateReader for InMemoryCloudState {
    fn resolve_load_balancers(&self,
                              scope: &ResourceScope,
                              cloud_ids: &[String])
                              -> Result<HashMap<String, LoadBalancer>> {
        self.check_failure()?;
        let state = self.guard();
        Ok(state.load_balancers
                .iter()
                .filter(|lb| {
                    lb.vendor == scope.vendor
                    && lb.account_id == scope.account_id
                    && lb.bk_biz_id == scope.bk_biz_id
                    && cloud_ids.contains(&lb.cloud_id)
                })
                .map(|lb| (lb.cloud_id.clone(), lb.clone()))
                .collect())
    }

    fn list_listeners_by_port(&self, _scope: &ResourceScope, lb_cloud_id: &str, port: u32) -> Result<Vec<Listener>> {
        self.listener_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let state = self.guard();
        Ok(state.listeners
                .iter()
                .filter(|l| l.cloud_lb_id == lb_cloud_id && l.port == port)
                .cloned()
                .collect())
    }

    fn find_url_rule(&self,
                     _scope: &ResourceScope,
                     lb_cloud_id: &str,
                     listener_cloud_id: &str,
                     domain: &str,
                     url: &str)
                     -> Result<Option<UrlRule>> {
        self.check_failure()?;
        let state = self.guard();
        Ok(state.url_rules
                .iter()
                .find(|r| {
                    r.cloud_lb_id == lb_cloud_id
                    && r.listener_cloud_id == listener_cloud_id
                    && r.domain == domain
                    && r.url == url
                })
                .cloned())
    }

    fn list_targets(&self, target_group_id: &str) -> Result<Vec<Target>> {
        self.check_failure()?;
        let state = self.guard();
        Ok(state.targets.iter().filter(|t| t.target_group_id == target_group_id).cloned().collect())
    }

    fn find_instance_by_ip(&self, _scope: &ResourceScope, ip: &str) -> Result<Option<Instance>> {
        self.check_failure()?;
        let state = self.guard();
        Ok(state.instances.iter().find(|i| i.private_ipv4_addresses.iter().any(|a| a == ip)).cloned())
    }
}
