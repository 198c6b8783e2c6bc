use crate::IdentityResolver;
use chrono::{Duration, Utc};
use confab_core::{ConfabError, ConfabResult, Identity};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Claims carried by a Confab access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: becomes the caller [`Identity`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry as seconds since the Unix epoch. Checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Not-before as seconds since the Unix epoch. Checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

/// Verifies (and, for local use, issues) HS256-signed JSON Web Tokens.
///
/// Every verification failure collapses into
/// [`ConfabError::AuthenticationRequired`]; the reason is only logged.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenAuthority {
    /// Create an authority for the given shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is optional; when present it is enforced without grace.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> ConfabResult<String> {
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: Some((Utc::now() + ttl).timestamp()),
            nbf: None,
        };
        self.sign(&claims)
    }

    /// Check signature, algorithm, subject and time window of `token`.
    pub fn verify(&self, token: &str) -> ConfabResult<Identity> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                warn!(reason = %e, "Rejected access token");
                ConfabError::AuthenticationRequired
            })?
            .claims;
        match claims.sub {
            Some(sub) if !sub.is_empty() => {
                debug!(sub = %sub, "Access token verified");
                Ok(Identity::new(sub))
            }
            _ => {
                warn!("Rejected access token: missing subject");
                Err(ConfabError::AuthenticationRequired)
            }
        }
    }

    fn sign(&self, claims: &Claims) -> ConfabResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ConfabError::Config(format!("cannot sign token: {e}")))
    }
}

impl IdentityResolver for TokenAuthority {
    fn resolve(&self, credential: Option<&str>) -> ConfabResult<Identity> {
        match credential {
            Some(token) => self.verify(token),
            None => Err(ConfabError::AuthenticationRequired),
        }
    }
}
