// Archivo: models.rs
// Propósito: modelos de los recursos remotos que consulta la importación.
// Sólo contienen los campos que usan las validaciones y el compilador de
// flows; no pretenden reflejar la respuesta completa de cada proveedor.
use crate::errors::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proveedores de nube conocidos por la plataforma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    TCloud,
    Aws,
    Gcp,
    Azure,
    HuaWei,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::TCloud => "tcloud",
            Vendor::Aws => "aws",
            Vendor::Gcp => "gcp",
            Vendor::Azure => "azure",
            Vendor::HuaWei => "huawei",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcloud" => Ok(Vendor::TCloud),
            "aws" => Ok(Vendor::Aws),
            "gcp" => Ok(Vendor::Gcp),
            "azure" => Ok(Vendor::Azure),
            "huawei" => Ok(Vendor::HuaWei),
            other => Err(ProviderError::UnknownValue { kind: "vendor", value: other.to_string() }),
        }
    }
}

/// Protocolo de un listener. Se compara siempre en mayúsculas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }

    /// Protocolos de capa 7 (reglas por dominio/URL).
    pub fn is_layer7(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            "HTTP" => Ok(Protocol::Http),
            "HTTPS" => Ok(Protocol::Https),
            other => Err(ProviderError::UnknownValue { kind: "protocol", value: other.to_string() }),
        }
    }
}

/// Tipo de backend (RS) que se vincula a un target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstType {
    Cvm,
    Eni,
}

impl InstType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstType::Cvm => "CVM",
            InstType::Eni => "ENI",
        }
    }
}

impl fmt::Display for InstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InstType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CVM" => Ok(InstType::Cvm),
            "ENI" => Ok(InstType::Eni),
            other => Err(ProviderError::UnknownValue { kind: "inst_type", value: other.to_string() }),
        }
    }
}

/// Ámbito de una consulta: cuenta y unidad de negocio del operador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceScope {
    pub vendor: Vendor,
    pub account_id: String,
    pub bk_biz_id: i64,
}

/// Balanceador de carga (CLB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Id interno de la plataforma.
    pub id: String,
    pub cloud_id: String,
    pub vendor: Vendor,
    pub account_id: String,
    pub bk_biz_id: i64,
    pub region: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub private_ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub private_ipv6_addresses: Vec<String>,
    #[serde(default)]
    pub public_ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub public_ipv6_addresses: Vec<String>,
}

impl LoadBalancer {
    /// Todas las direcciones conocidas del balanceador.
    pub fn addresses(&self) -> impl Iterator<Item = &String> {
        self.private_ipv4_addresses
            .iter()
            .chain(self.private_ipv6_addresses.iter())
            .chain(self.public_ipv4_addresses.iter())
            .chain(self.public_ipv6_addresses.iter())
    }

    /// `true` si `vip` coincide con el dominio o con alguna dirección.
    pub fn matches_vip(&self, vip: &str) -> bool {
        if vip.is_empty() {
            return false;
        }
        (!self.domain.is_empty() && self.domain == vip) || self.addresses().any(|a| a == vip)
    }
}

/// Información de certificados de un listener HTTPS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub ssl_mode: Option<String>,
    pub ca_cloud_id: Option<String>,
    #[serde(default)]
    pub cert_cloud_ids: Vec<String>,
}

/// Listener existente en un balanceador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub id: String,
    pub cloud_id: String,
    pub cloud_lb_id: String,
    pub protocol: Protocol,
    pub port: u32,
    #[serde(default)]
    pub end_port: Option<u32>,
    /// SNI activado: varios certificados por dominio.
    #[serde(default)]
    pub sni_switch: bool,
    #[serde(default)]
    pub certificate: Option<CertificateInfo>,
}

/// Regla URL (dominio + ruta) de un listener de capa 7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRule {
    pub id: String,
    pub cloud_id: String,
    pub cloud_lb_id: String,
    pub listener_cloud_id: String,
    pub domain: String,
    pub url: String,
    #[serde(default)]
    pub target_group_id: Option<String>,
}

/// Backend (RS) ya vinculado a un target group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub target_group_id: String,
    pub ip: String,
    pub port: u32,
    pub weight: u32,
    pub inst_type: InstType,
}

/// Instancia de cómputo (CVM) localizable por IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub cloud_id: String,
    pub name: String,
    #[serde(default)]
    pub private_ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub public_ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub cloud_vpc_ids: Vec<String>,
    #[serde(default)]
    pub zone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parse_is_case_insensitive() {
        assert_eq!("https".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!(" Http ".parse::<Protocol>().unwrap(), Protocol::Http);
        assert!("QUIC".parse::<Protocol>().is_err());
    }

    #[test]
    fn vip_matches_domain_or_any_address() {
        let lb = LoadBalancer { id: "lb-internal".into(),
                                cloud_id: "lb-1".into(),
                                vendor: Vendor::TCloud,
                                account_id: "acc".into(),
                                bk_biz_id: 1,
                                region: "ap-guangzhou".into(),
                                domain: "lb-1.example.com".into(),
                                private_ipv4_addresses: vec!["10.0.0.1".into()],
                                private_ipv6_addresses: vec![],
                                public_ipv4_addresses: vec!["1.1.1.1".into()],
                                public_ipv6_addresses: vec![] };
        assert!(lb.matches_vip("lb-1.example.com"));
        assert!(lb.matches_vip("1.1.1.1"));
        assert!(lb.matches_vip("10.0.0.1"));
        assert!(!lb.matches_vip("2.2.2.2"));
        assert!(!lb.matches_vip(""));
    }
}
