use crate::errors::{ImportError, Result};
use flow::RetryPolicy;
use serde::{Deserialize, Serialize};

pub const ENV_LISTENER_BATCH_LIMIT: &str = "IMPORT_LISTENER_BATCH_LIMIT";
pub const ENV_BIND_RS_BATCH_LIMIT: &str = "IMPORT_BIND_RS_BATCH_LIMIT";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "IMPORT_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_MIN_BACKOFF_MS: &str = "IMPORT_RETRY_MIN_BACKOFF_MS";
pub const ENV_RETRY_MAX_BACKOFF_MS: &str = "IMPORT_RETRY_MAX_BACKOFF_MS";

/// Configuración del importador: límites de lote y política de reintentos
/// que llevan todas las tareas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Listeners por tarea de creación.
    pub listener_batch_limit: usize,
    /// RS por tarea de vinculación.
    pub bind_rs_batch_limit: usize,
    pub retry: RetryPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { listener_batch_limit: 20,
               bind_rs_batch_limit: 100,
               retry: RetryPolicy::default() }
    }
}

impl ImportConfig {
    /// Lee la configuración del entorno (y de `.env` si existe).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de
    /// variables; las ausentes conservan el valor por defecto.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
        where F: Fn(&str) -> Option<String>
    {
        let mut cfg = Self::default();
        if let Some(v) = parse_var::<usize>(&lookup, ENV_LISTENER_BATCH_LIMIT)? {
            cfg.listener_batch_limit = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, ENV_BIND_RS_BATCH_LIMIT)? {
            cfg.bind_rs_batch_limit = v;
        }
        if let Some(v) = parse_var::<u32>(&lookup, ENV_RETRY_MAX_ATTEMPTS)? {
            cfg.retry.max_attempts = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, ENV_RETRY_MIN_BACKOFF_MS)? {
            cfg.retry.min_backoff_ms = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, ENV_RETRY_MAX_BACKOFF_MS)? {
            cfg.retry.max_backoff_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listener_batch_limit == 0 || self.bind_rs_batch_limit == 0 {
            return Err(ImportError::Config("los límites de lote deben ser mayores que cero".into()));
        }
        if !self.retry.is_valid() {
            return Err(ImportError::Config(format!("política de reintentos inválida: {:?}", self.retry)));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim()
                        .parse::<T>()
                        .map(Some)
                        .map_err(|_| ImportError::Config(format!("{}: valor no numérico '{}'", key, raw))),
    }
}
