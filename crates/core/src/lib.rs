//! Access-controlled notes: accounts, documents, grants, version history and
//! sharing with not-yet-registered recipients.

pub mod account;
pub mod auth;
pub mod document;
pub mod error;
pub mod hub;
pub mod identity;
pub mod notify;
pub mod patch;
pub mod permission;
pub mod relay;
pub mod sharing;
pub mod store;
pub mod validate;
pub mod version;

pub use error::{CoreError, CoreResult};
pub use hub::NoteHub;
pub use store::{MemoryStore, PgStore, SharedStore, Store, StoreError};
