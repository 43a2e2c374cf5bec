//! Comportamiento común de los registros importables: forma de columnas,
//! reglas locales (sin llamadas remotas) y claves de deduplicación.

mod bind_rs;
mod layer7_listener;

use crate::normalizer::FieldSpec;
use import_domain::{RecordState, TaskOperation};
use serde::de::DeserializeOwned;
use serde::Serialize;


/// Registro que atraviesa el pipeline de importación.
pub trait ImportRecord: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    const OPERATION: TaskOperation;

    /// Tabla columna → campo de la forma de registro.
    fn columns() -> &'static [FieldSpec<Self>];

    fn state(&self) -> &RecordState;

    fn state_mut(&mut self) -> &mut RecordState;

    /// Cloud id del balanceador al que apunta el registro.
    fn lb_cloud_id(&self) -> &str;

    fn clb_vip_domain(&self) -> &str;

    /// Guarda el id interno del balanceador resuelto.
    fn set_lb_id(&mut self, lb_id: &str);

    fn lb_id(&self) -> Option<&str>;

    /// Deja los campos enumerados en su forma canónica (mayúsculas), igual
    /// que el normalizador; los registros reenviados como JSON pueden venir
    /// editados a mano.
    fn canonicalize(&mut self);

    /// Clave compuesta recurso + discriminante para detectar duplicados.
    fn dedup_key(&self) -> String;

    /// Reglas que sólo miran la fila. Marcan el registro como no ejecutable
    /// y anotan cada incumplimiento.
    fn check_local(&mut self);
}

/// Comprueba una lista de puertos: no vacía, en `1..=65535` y, si es un
/// rango, consecutiva y ascendente (tal como la deja el normalizador).
pub(crate) fn port_violations(field: &str, ports: &[u32], allow_range: bool) -> Vec<String> {
    let mut out = Vec::new();
    if ports.is_empty() {
        out.push(format!("{}: obligatorio", field));
        return out;
    }
    if ports.iter().any(|p| *p == 0 || *p > 65535) {
        out.push(format!("{}: fuera del rango 1-65535", field));
    }
    if !allow_range && ports.len() > 1 {
        out.push(format!("{}: se admite un solo valor", field));
    } else if ports.windows(2).any(|w| w[1] != w[0] + 1) {
        out.push(format!("{}: el rango debe ser ascendente", field));
    }
    out
}
