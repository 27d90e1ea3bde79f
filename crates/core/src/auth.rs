//! Bearer credential verification.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::account::NewAccount;
use crate::error::{CoreError, CoreResult};

/// Identity asserted by a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl VerifiedIdentity {
    /// Account input used when auto-provisioning the subject.
    pub fn to_new_account(&self) -> NewAccount {
        NewAccount {
            id: self.subject_id.clone(),
            email: self.email.clone(),
            display_name: self.name.clone(),
            avatar_ref: self.picture.clone(),
        }
    }
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> CoreResult<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> CoreResult<VerifiedIdentity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid signature",
                ErrorKind::InvalidIssuer => "invalid issuer",
                _ => "malformed token",
            };
            CoreError::InvalidCredential(reason.to_string())
        })?;

        let claims = data.claims;
        let email = claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| CoreError::InvalidCredential("token carries no email".to_string()))?;

        Ok(VerifiedIdentity {
            subject_id: claims.sub,
            email,
            email_verified: claims.email_verified,
            name: claims.name,
            picture: claims.picture,
        })
    }
}
