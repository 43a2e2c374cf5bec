use serde::{Deserialize, Serialize};
use std::fmt;

/// Resultado de validar un registro importado.
///
/// Un registro nace `Unvalidated` y termina en uno de los otros tres
/// estados. `NotExecutable` es definitivo: las comprobaciones posteriores
/// sólo añaden mensajes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Unvalidated,
    Executable,
    Existing,
    NotExecutable,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Unvalidated => "unvalidated",
            ImportStatus::Executable => "executable",
            ImportStatus::Existing => "existing",
            ImportStatus::NotExecutable => "not_executable",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImportStatus::Unvalidated)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estado de validación embebido en cada registro (`status` y
/// `validate_result` se serializan a la altura de los campos del registro).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordState {
    #[serde(default)]
    pub status: ImportStatus,
    #[serde(default)]
    pub validate_result: Vec<String>,
}

impl RecordState {
    /// Vuelve a `Unvalidated` y descarta los mensajes anteriores.
    pub fn reset(&mut self) {
        self.status = ImportStatus::Unvalidated;
        self.validate_result.clear();
    }

    /// Marca el registro como no ejecutable y anota el motivo.
    pub fn set_not_executable(&mut self, reason: impl Into<String>) {
        self.status = ImportStatus::NotExecutable;
        self.validate_result.push(reason.into());
    }

    /// Marca el registro como ya existente salvo que esté fijado en
    /// `NotExecutable`.
    pub fn set_existing(&mut self) {
        if self.status != ImportStatus::NotExecutable {
            self.status = ImportStatus::Existing;
        }
    }

    /// Cierra la validación: lo que siga sin estado pasa a `Executable`.
    pub fn finish(&mut self) {
        if self.status == ImportStatus::Unvalidated {
            self.status = ImportStatus::Executable;
        }
    }

    pub fn is_not_executable(&self) -> bool {
        self.status == ImportStatus::NotExecutable
    }

    pub fn is_executable(&self) -> bool {
        self.status == ImportStatus::Executable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_executable_is_pinned() {
        let mut s = RecordState::default();
        s.set_not_executable("puerto inválido");
        s.set_existing();
        s.finish();
        assert_eq!(s.status, ImportStatus::NotExecutable);
        assert_eq!(s.validate_result, vec!["puerto inválido".to_string()]);
    }

    #[test]
    fn existing_survives_finish() {
        let mut s = RecordState::default();
        s.set_existing();
        s.finish();
        assert_eq!(s.status, ImportStatus::Existing);
        s.reset();
        assert_eq!(s.status, ImportStatus::Unvalidated);
        s.finish();
        assert!(s.is_executable());
    }
}
