pub mod model;
pub mod pending;
pub mod service;

pub use model::{Collaborator, CollaboratorListing, UNKNOWN_OWNER_NAME};
pub use pending::PendingShares;
pub use service::SharingService;
