//! Capacidades de importación del proveedor TCloud.
//!
//! Cada operación tiene su propio tipo que implementa `VendorCapability`:
//! las reglas contra el estado remoto y la forma de los flows que genera.
//! Las consultas remotas se cachean por clave durante una llamada para no
//! repetirlas cuando varias filas apuntan al mismo listener o target group.

mod bind_rs;
mod layer7_listener;

pub use bind_rs::{TCloudBindRs, BIND_RS_ACTION, BIND_RS_FLOW};
pub use layer7_listener::{TCloudLayer7Listener, CREATE_LISTENER_ACTION, CREATE_LISTENER_FLOW};

use crate::errors::{ImportError, Result};
use crate::record::ImportRecord;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Caché de consultas remotas para una sola validación.
pub(crate) struct LookupCache<K, V> {
    what: &'static str,
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Debug, V> LookupCache<K, V> {
    pub(crate) fn new(what: &'static str) -> Self {
        Self { what, entries: HashMap::new() }
    }

    pub(crate) fn get_or_fetch<F>(&mut self, key: K, fetch: F) -> Result<&V>
        where F: FnOnce(&K) -> cloud_providers::Result<V>
    {
        match self.entries.entry(key) {
            Entry::Occupied(e) => {
                debug!("caché de {}: acierto para {:?}", self.what, e.key());
                Ok(e.into_mut())
            }
            Entry::Vacant(e) => {
                let value = fetch(e.key())?;
                Ok(e.insert(value))
            }
        }
    }
}

/// Id interno del balanceador resuelto por la validación común.
pub(crate) fn resolved_lb_id<R: ImportRecord>(record: &R) -> Result<String> {
    match record.lb_id() {
        Some(id) => Ok(id.to_string()),
        None => Err(ImportError::Structural(format!("el registro del balanceador {} no pasó por la validación",
                                                    record.lb_cloud_id()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_fetches_each_key_once() {
        let mut cache: LookupCache<(String, u32), u32> = LookupCache::new("prueba");
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache.get_or_fetch(("lb-1".into(), 80), |(_, p)| {
                             calls += 1;
                             Ok(*p + 1)
                         })
                         .unwrap();
            assert_eq!(*v, 81);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let mut cache: LookupCache<u32, u32> = LookupCache::new("prueba");
        let err = cache.get_or_fetch(1, |_| Err(cloud_providers::ProviderError::Remote("timeout".into())));
        assert!(matches!(err, Err(ImportError::Remote(_))));
        assert_eq!(*cache.get_or_fetch(1, |_| Ok(7)).unwrap(), 7);
    }
}
