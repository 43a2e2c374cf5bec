// Archivo: records.rs
// Propósito: registros normalizados de cada operación de importación. Son
// los objetos que ve el operador en la previsualización y los que se
// serializan como parámetros de cada TaskItem.
use crate::status::RecordState;
use cloud_providers::{InstType, Instance, Protocol};
use serde::{Deserialize, Serialize};

/// Fila de "crear listener de capa 7".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CreateLayer7ListenerDetail {
    pub clb_vip_domain: String,
    pub cloud_clb_id: String,
    /// Protocolo tal como llegó, en mayúsculas.
    pub protocol: String,
    /// Puerto único o rango `[inicio, fin]` expandido a la lista ascendente
    /// de todos sus puertos.
    pub listener_port: Vec<u32>,
    #[serde(default)]
    pub ssl_mode: String,
    #[serde(default)]
    pub cert_cloud_ids: Vec<String>,
    #[serde(default)]
    pub ca_cloud_id: String,
    #[serde(default)]
    pub user_remark: String,

    #[serde(flatten)]
    pub state: RecordState,

    /// Id interno del balanceador, resuelto durante la validación.
    #[serde(skip)]
    pub lb_id: Option<String>,
}

impl CreateLayer7ListenerDetail {
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol.parse().ok()
    }

    pub fn first_port(&self) -> Option<u32> {
        self.listener_port.first().copied()
    }

    /// Último puerto del rango, si lo hay.
    pub fn end_port(&self) -> Option<u32> {
        if self.listener_port.len() > 1 { self.listener_port.last().copied() } else { None }
    }
}

/// Fila de "vincular RS a un listener de capa 7".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Layer7ListenerBindRsDetail {
    pub clb_vip_domain: String,
    pub cloud_clb_id: String,
    pub protocol: String,
    pub listener_port: Vec<u32>,
    pub domain: String,
    pub url_path: String,
    pub inst_type: String,
    pub rs_ip: String,
    pub rs_port: Vec<u32>,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub user_remark: String,
    #[serde(default)]
    pub rs_remark: String,

    #[serde(flatten)]
    pub state: RecordState,

    #[serde(skip)]
    pub lb_id: Option<String>,
    /// Target group de la regla URL encontrada.
    #[serde(skip)]
    pub target_group_id: Option<String>,
    /// Instancia CVM encontrada por IP.
    #[serde(skip)]
    pub instance: Option<Instance>,
}

impl Layer7ListenerBindRsDetail {
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol.parse().ok()
    }

    pub fn inst_type(&self) -> Option<InstType> {
        self.inst_type.parse().ok()
    }

    pub fn first_port(&self) -> Option<u32> {
        self.listener_port.first().copied()
    }

    pub fn first_rs_port(&self) -> Option<u32> {
        self.rs_port.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImportStatus;

    #[test]
    fn status_is_flattened_and_resolved_fields_are_skipped() {
        let mut d = CreateLayer7ListenerDetail { cloud_clb_id: "lb-1".into(),
                                                 protocol: "HTTP".into(),
                                                 listener_port: vec![80],
                                                 lb_id: Some("00000a".into()),
                                                 ..Default::default() };
        d.state.set_not_executable("x");
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["status"], "not_executable");
        assert_eq!(v["validate_result"][0], "x");
        assert!(v.get("lb_id").is_none());

        let back: CreateLayer7ListenerDetail = serde_json::from_value(v).unwrap();
        assert_eq!(back.state.status, ImportStatus::NotExecutable);
        assert_eq!(back.lb_id, None);
    }

    #[test]
    fn port_helpers() {
        let d = CreateLayer7ListenerDetail { listener_port: (8000..=8010).collect(), ..Default::default() };
        assert_eq!(d.first_port(), Some(8000));
        assert_eq!(d.end_port(), Some(8010));
        let d = CreateLayer7ListenerDetail { listener_port: vec![80], ..Default::default() };
        assert_eq!(d.end_port(), None);
    }
}
