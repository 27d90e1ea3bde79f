pub mod model;
pub mod service;

pub use model::{AccessLevel, Permission};
pub use service::PermissionService;
