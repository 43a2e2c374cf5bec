use cloud_providers::{ResourceScope, Vendor};
use serde::{Deserialize, Serialize};

/// Datos del operador que acompañan a cada llamada de importación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    pub vendor: Vendor,
    pub bk_biz_id: i64,
    pub account_id: String,
    /// Regiones autorizadas para esta importación.
    pub region_ids: Vec<String>,
}

impl ImportContext {
    pub fn scope(&self) -> ResourceScope {
        ResourceScope { vendor: self.vendor, account_id: self.account_id.clone(), bk_biz_id: self.bk_biz_id }
    }

    pub fn region_allowed(&self, region: &str) -> bool {
        self.region_ids.iter().any(|r| r == region)
    }
}
