pub mod id;

pub use id::{
    derive_placeholder_id, local_part, normalize_email, reconstruct_email, AccountIdKind,
    IdentityError,
};
