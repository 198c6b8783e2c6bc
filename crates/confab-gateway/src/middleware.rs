use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use confab_security::extract_credential;
use std::sync::Arc;
use tracing::{debug, warn};

/// Auth configuration for the gateway.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Cookie checked first for the access token.
    pub cookie_name: String,
    /// Mark cookies written by the gateway as `Secure`.
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Config reading the token from `cookie_name`.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secure_cookies: false,
        }
    }

    /// `Set-Cookie` value that removes the access token cookie.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
            self.cookie_name
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new("access-token")
    }
}

/// Auth middleware: resolves the caller and stores the
/// [`Identity`](confab_core::Identity) in the request extensions.
///
/// Checks `Authorization: Bearer <token>` first, then the configured cookie
/// and its fallbacks. Requests without a valid credential get a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let cookies = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let credential = extract_credential(authorization, cookies, &state.auth.cookie_name);

    match state.resolver.resolve(credential.as_deref()) {
        Ok(identity) => {
            debug!(identity = %identity, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            warn!(path = %request.uri().path(), "Rejected unauthenticated request");
            ApiError(e).into_response()
        }
    }
}
