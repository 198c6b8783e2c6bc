//! Caller identity resolution for Confab.
//!
//! Request handling never touches storage before an [`Identity`] has been
//! resolved. Resolution happens in two steps: [`extract_credential`] pulls a
//! bearer token out of the request headers, then an [`IdentityResolver`]
//! turns it into an identity or rejects it with
//! [`ConfabError::AuthenticationRequired`](confab_core::ConfabError).
//!
//! # Main types
//!
//! - [`IdentityResolver`]: Seam for whatever verifies credentials.
//! - [`TokenAuthority`]: HS256 JSON Web Token verifier (and local issuer).

/// Credential extraction from headers and cookies.
pub mod credential;
/// HS256 token verification.
pub mod token;

pub use credential::{extract_credential, FALLBACK_COOKIE_NAMES};
pub use token::{Claims, TokenAuthority};

use confab_core::{ConfabResult, Identity};

/// Resolves a request credential into the caller's identity.
pub trait IdentityResolver: Send + Sync {
    /// `None` means the request carried no credential at all.
    fn resolve(&self, credential: Option<&str>) -> ConfabResult<Identity>;
}
