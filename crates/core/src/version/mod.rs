pub mod model;
pub mod service;

pub use model::{Version, VersionEntry};
pub use service::{VersionService, UNKNOWN_AUTHOR};
