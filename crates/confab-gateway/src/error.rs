use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use confab_core::ConfabError;
use tracing::error;

/// A [`ConfabError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ConfabError);

impl From<ConfabError> for ApiError {
    fn from(err: ConfabError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConfabError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ConfabError::NotFound(_) | ConfabError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "detail": self.0.to_string() }));
        match status {
            StatusCode::UNAUTHORIZED => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!(error = %self.0, "Request failed");
                (status, body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
