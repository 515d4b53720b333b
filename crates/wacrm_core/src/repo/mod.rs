//! Record store boundary and its SQLite implementation.
//!
//! # Responsibility
//! - Define the storage contract the façade depends on.
//! - Keep SQL and row mapping inside the persistence boundary.
//!
//! # Invariants
//! - Every read and write is scoped by `user_id`.
//! - Conditional writes fail with `StaleWrite` instead of overwriting.

pub mod filter;
pub mod record_store;
pub mod sqlite_store;
