//! Record façade and domain use-cases.
//!
//! # Responsibility
//! - Apply create/partial-update/delete/list contracts generically per entity.
//! - Layer board, membership and message-status operations on the façade.
//!
//! # Invariants
//! - Service code never bypasses `RecordStore` conditional writes.
//! - Multi-record changes run inside one `RecordStore::atomically` unit.

pub mod contacts;
pub mod error;
pub mod facade;
pub mod lead_board;
pub mod scheduled;
