//! Relational storage layer for users, roles and user groups.
//!
//! [`store::UserStore`] is the SeaORM-backed access layer (SQLite with WAL
//! mode by default, schema managed by `sea-orm-migration`). On top of it,
//! [`entity_manager::EntityManager`] provides a staged write path: records
//! are collected with `persist` and committed by `flush` in one transaction,
//! so a record staged by a failed operation can still be detached before the
//! next flush picks it up.

pub mod auth;
pub mod entities;
pub mod entity_manager;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use entity_manager::{EntityManager, EntityRecord};
pub use error::StorageError;
pub use store::UserStore;
