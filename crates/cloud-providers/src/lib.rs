//! cloud-providers: lectura del estado vivo de la nube
//!
//! Este crate define los modelos de recursos remotos que el pipeline de
//! importación necesita consultar (balanceadores, listeners, reglas URL,
//! target groups e instancias), el contrato `CloudStateReader` y una
//! implementación en memoria (`InMemoryCloudState`) que puede cargarse desde
//! un snapshot JSON. Las llamadas reales a la API de cada proveedor quedan
//! fuera de este crate.

mod errors;
mod memory;
mod models;
mod reader;

pub use errors::{ProviderError, Result};
pub use memory::{CloudStateSnapshot, InMemoryCloudState};
pub use models::{CertificateInfo, Instance, InstType, Listener, LoadBalancer, Protocol, ResourceScope, Target,
                 UrlRule, Vendor};
pub use reader::CloudStateReader;
