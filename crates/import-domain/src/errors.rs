// error.rs
use cloud_providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error de almacenamiento: {0}")]
  StorageError(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<ProviderError> for DomainError {
  fn from(e: ProviderError) -> Self {
    Self::ValidationError(e.to_string())
  }
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
