pub mod model;
pub mod service;

pub use model::{Account, NewAccount, ProfilePatch, PublicProfile};
pub use service::{AccountService, Registration};
