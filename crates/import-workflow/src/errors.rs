use thiserror::Error;
use uuid::Uuid;

// Errores del importador.
//
// Este enum centraliza los errores que abortan una llamada completa:
// errores estructurales de la entrada, fallos remotos, del libro de tareas
// y del motor de flows. Los problemas de un registro concreto NO son
// errores: se reflejan en su estado `NotExecutable`.
#[derive(Error, Debug)]
pub enum ImportError {
  /// Forma de fila inválida, valor no numérico, JSON mal formado...
  #[error("Error estructural: {0}")]
  Structural(String),

  /// Combinación proveedor/operación sin capacidad registrada.
  #[error("Operación no soportada: {operation} para {vendor}")]
  UnsupportedOperation { vendor: String, operation: String },

  /// Un balanceador referenciado no existe en el ámbito del operador.
  #[error("Recurso no encontrado: {0}")]
  ResourceNotFound(String),

  /// Fallo del lector de estado remoto.
  #[error("Error remoto: {0}")]
  Remote(#[from] cloud_providers::ProviderError),

  /// El estado remoto no respeta una invariante esperada.
  #[error("Estado remoto inconsistente: {0}")]
  InconsistentRemoteState(String),

  /// Errores originados por el libro de tareas o el almacén de bloqueos.
  #[error("Error del libro de tareas: {0}")]
  Ledger(#[from] import_domain::DomainError),

  /// El almacén creó un número de TaskItems distinto al pedido.
  #[error("Libro de tareas inconsistente: se pidieron {expected} items y se crearon {created}")]
  LedgerMismatch { expected: usize, created: usize },

  /// Errores originados por el motor de flows.
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::FlowError),

  /// Otro flow sin terminar retiene el recurso.
  #[error("Recurso ocupado: {resource} (flow {owner_flow_id})")]
  ResourceBusy { resource: String, owner_flow_id: Uuid },

  /// Ningún registro quedó ejecutable.
  #[error("No hay registros ejecutables")]
  NothingToExecute,

  /// Falló la compilación y también la compensación del libro de tareas.
  #[error("Fallo al compensar el job {job_id}: {rollback} (causa original: {cause})")]
  RollbackFailed { job_id: Uuid, cause: String, rollback: String },

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Configuración inválida.
  #[error("Error de configuración: {0}")]
  Config(String),
}

impl ImportError {
  /// Distingue la contención de bloqueos del resto de fallos.
  pub fn is_busy(&self) -> bool {
    matches!(self, ImportError::ResourceBusy { .. })
  }
}

pub type Result<T> = std::result::Result<T, ImportError>;
