use thiserror::Error;

/// Errores al consultar el estado remoto.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
  /// La llamada remota falló (timeout, permisos, red...).
  #[error("Error remoto: {0}")]
  Remote(String),
  /// Valor de enumeración desconocido (vendor, protocolo, tipo de instancia).
  #[error("Valor desconocido para {kind}: {value}")]
  UnknownValue { kind: &'static str, value: String },
  /// El snapshot de estado no pudo leerse o interpretarse.
  #[error("Error de snapshot: {0}")]
  Snapshot(String),
}

impl From<serde_json::Error> for ProviderError {
  fn from(e: serde_json::Error) -> Self {
    Self::Snapshot(e.to_string())
  }
}

impl From<std::io::Error> for ProviderError {
  fn from(e: std::io::Error) -> Self {
    Self::Snapshot(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
