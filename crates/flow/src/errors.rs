// Archivo: errors.rs
// Propósito: definir los errores del motor de flows y el alias Result<T>
// usado por las APIs del crate.
use thiserror::Error;
/// Errores comunes del dominio de flujos.
///
/// - `NotFound`: flow inexistente.
/// - `InvalidState`: transición no permitida (p.ej. arrancar un flow ya
///   terminado).
/// - `InvalidTasks`: la lista de tareas no forma una cadena válida.
/// - `Storage`: error al acceder al almacenamiento del motor.
/// - `Submission`: el motor rechazó el envío.
#[derive(Error, Debug)]
pub enum FlowError {
  /// Entidad no encontrada.
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Transición de estado no permitida.
  #[error("Estado inválido: {0}")]
  InvalidState(String),
  /// Tareas mal formadas (ids repetidos, dependencias rotas...).
  #[error("Tareas inválidas: {0}")]
  InvalidTasks(String),
  /// Error genérico de almacenamiento.
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  /// El motor no aceptó el flow.
  #[error("Envío rechazado: {0}")]
  Submission(String),
}
/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
