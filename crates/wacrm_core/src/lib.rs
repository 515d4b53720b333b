//! Owner-scoped CRM records for a WhatsApp messaging desk.
//! Contacts, lists, the lead board, quick replies and scheduled messages
//! all go through one generic record façade over a SQLite store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::contact::{
    Contact, ContactList, ContactListMember, CreateContactData, CreateContactListData,
    CreateContactListMemberData, UpdateContactData, UpdateContactListData,
};
pub use model::lead::{
    CreateLeadColumnData, CreateLeadData, Lead, LeadColumn, MoveLeadData, UpdateLeadColumnData,
    UpdateLeadData, APPEND_POSITION,
};
pub use model::quick_reply::{CreateQuickReplyData, QuickReply, UpdateQuickReplyData};
pub use model::scheduled_message::{
    CreateScheduledMessageData, ScheduledMessage, ScheduledStatus, StatusTransition,
    UpdateScheduledMessageData,
};
pub use model::{
    ConflictError, Entity, EntityKind, Patch, RecordId, Timestamp, ValidationError,
};
pub use repo::filter::Filter;
pub use repo::record_store::{RecordStore, StoreError, StoreResult};
pub use repo::sqlite_store::SqliteRecordStore;
pub use service::error::{FacadeError, FacadeResult};
pub use service::facade::RecordFacade;
pub use service::lead_board::BoardColumn;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
