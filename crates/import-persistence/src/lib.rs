//! Persistencia Diesel del libro de tareas de importación y de los bloqueos
//! recurso → flow. Expone el módulo `schema` y reexporta el repositorio que
//! implementa `TaskLedgerStore` y `ResourceLockStore`; el detalle está en
//! `ledger_persistence.rs`.

mod ledger_persistence;
pub mod schema;

pub use ledger_persistence::{new_from_env, DieselLedgerRepository, MIGRATIONS};
