/// Account ID parsing utilities.
///
/// Account IDs come in two shapes:
/// - Registered: the subject id issued by the identity provider, used verbatim.
/// - Placeholder: `pending_{local}_{domain_with_underscores}`, derived from an
///   email address that was granted access before its owner registered.
use thiserror::Error;

const PLACEHOLDER_PREFIX: &str = "pending_";
const SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}

/// Lowercase and trim an email for lookups and id derivation.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Local part of an email address, used as the default display name.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Derive the deterministic placeholder id for an email address.
///
/// Equivalent emails (same after [`normalize_email`]) always map to the same id.
pub fn derive_placeholder_id(email: &str) -> Result<String, IdentityError> {
    let normalized = normalize_email(email);
    let (local, domain) = normalized
        .split_once('@')
        .ok_or_else(|| IdentityError::InvalidEmail(email.to_string()))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(IdentityError::InvalidEmail(email.to_string()));
    }

    let domain = domain.replace('.', "_");
    Ok(format!("{PLACEHOLDER_PREFIX}{local}{SEPARATOR}{domain}"))
}

/// Best-effort inverse of [`derive_placeholder_id`].
///
/// Splits on the rightmost separator, so any underscore that came from a dotted
/// domain is read as part of the local part: `pending_bob_x_com` comes back as
/// `bob_x@com`. Persisted placeholder accounts carry the real email; this is only
/// used when no record exists.
pub fn reconstruct_email(placeholder_id: &str) -> Option<String> {
    let rest = placeholder_id.strip_prefix(PLACEHOLDER_PREFIX)?;
    let idx = rest.rfind(SEPARATOR)?;
    if idx == 0 {
        return None;
    }

    let (local, domain) = (&rest[..idx], &rest[idx + 1..]);
    if domain.is_empty() {
        return None;
    }

    Some(format!("{local}@{}", domain.replace(SEPARATOR, ".")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountIdKind {
    Registered(String),
    Placeholder { id: String, email: String },
}

impl AccountIdKind {
    /// Classify an account id. Ids carrying the placeholder prefix that cannot be
    /// reversed into an email are treated as registered.
    pub fn parse(id: &str) -> Self {
        match reconstruct_email(id) {
            Some(email) => AccountIdKind::Placeholder {
                id: id.to_string(),
                email,
            },
            None => AccountIdKind::Registered(id.to_string()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AccountIdKind::Placeholder { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_stable_across_case_and_whitespace() {
        let a = derive_placeholder_id("Bob@X.com").unwrap();
        let b = derive_placeholder_id("  bob@x.COM ").unwrap();
        assert_eq!(a, "pending_bob_x_com");
        assert_eq!(a, b);
    }

    #[test]
    fn derive_rejects_malformed_email() {
        assert!(derive_placeholder_id("bob").is_err());
        assert!(derive_placeholder_id("@x.com").is_err());
        assert!(derive_placeholder_id("bob@").is_err());
        assert!(derive_placeholder_id("a@b@c").is_err());
    }

    #[test]
    fn reconstruct_single_label_domain() {
        assert_eq!(
            reconstruct_email("pending_bob_localhost").as_deref(),
            Some("bob@localhost")
        );
    }

    #[test]
    fn reconstruct_is_lossy_for_dotted_domains() {
        let id = derive_placeholder_id("bob@x.com").unwrap();
        assert_eq!(reconstruct_email(&id).as_deref(), Some("bob_x@com"));
    }

    #[test]
    fn reconstruct_rejects_other_shapes() {
        assert_eq!(reconstruct_email("uid-123"), None);
        assert_eq!(reconstruct_email("pending_nounderscore"), None);
        assert_eq!(reconstruct_email("pending__com"), None);
        assert_eq!(reconstruct_email("pending_bob_"), None);
    }

    #[test]
    fn parse_kinds() {
        let kind = AccountIdKind::parse("pending_bob_localhost");
        assert!(kind.is_placeholder());
        assert_eq!(
            kind,
            AccountIdKind::Placeholder {
                id: "pending_bob_localhost".to_string(),
                email: "bob@localhost".to_string(),
            }
        );

        let kind = AccountIdKind::parse("firebase-uid");
        assert_eq!(kind, AccountIdKind::Registered("firebase-uid".to_string()));
        assert!(!kind.is_placeholder());
    }
}
