//! Bearer-token verification for the audit trail.
//!
//! Availability of hardware control wins over audit completeness: a missing
//! or unverifiable token degrades the actor to `anonymous` instead of
//! rejecting the request.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use grainhub_domain::audit::Actor;

/// Claims read from a verified token.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[allow(dead_code)]
    exp: i64,
}

/// Verifies HS256 bearer tokens into [`Actor`] identities.
pub struct TokenVerifier {
    /// Shared signing secret; `None` disables verification entirely.
    secret: Option<String>,
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Resolve the actor behind an `Authorization` header value.
    ///
    /// Returns [`Actor::anonymous`] when no secret is configured, no bearer
    /// token is present, or the token does not verify.
    #[must_use]
    pub fn actor_from_header(&self, header: Option<&str>) -> Actor {
        let Some(secret) = &self.secret else {
            return Actor::anonymous();
        };
        let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Actor::anonymous();
        };

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => Actor {
                identity: data.claims.sub,
                role: data
                    .claims
                    .role
                    .unwrap_or_else(|| "authenticated".to_string()),
            },
            Err(err) => {
                tracing::debug!(error = %err, "unverifiable token, degrading to anonymous");
                Actor::anonymous()
            }
        }
    }
}
