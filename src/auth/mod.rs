//! Bearer-token authentication boundary.
//!
//! Token issuance (signup/login) lives in the account service; this module
//! only verifies. A token is `"{user_uuid}.{signature}"` where `signature`
//! is the hex HMAC-SHA256 of the uuid's raw bytes under the shared
//! `AUTH_TOKEN_SECRET`.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::errors::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated caller, resolved from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

/// Verifies bearer tokens against the shared signing secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Arc<Vec<u8>>,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::new(secret.as_ref().to_vec()),
        }
    }

    /// Mint a token for `user`. The account service signs with the same
    /// secret; here it mainly serves the tests.
    pub fn sign(&self, user: Uuid) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(user.as_bytes());
        format!("{}.{}", user, hex::encode(mac.finalize().into_bytes()))
    }

    /// Returns the user id when `token` is well formed and its signature
    /// verifies; `None` otherwise.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let (user, signature) = token.split_once('.')?;
        let user: Uuid = user.parse().ok()?;
        let signature = hex::decode(signature).ok()?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(user.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(user)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    TokenVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_owned()))?;

        TokenVerifier::from_ref(state)
            .verify(token)
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, token failed".to_owned()))
    }
}

/// Hex SHA-256 digest of a device's shared secret, the form it is stored
/// and compared in. The plaintext never reaches the registry.
pub fn digest_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
