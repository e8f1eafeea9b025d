use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid path to a credential: the proactive refresh before a
    /// request failed, so the request was never sent.
    #[error("Authentication required - please log in again")]
    AuthenticationRequired,

    /// The backend rejected the credential and the follow-up refresh
    /// failed; the stored credential has been cleared.
    #[error("Unauthorized - session could not be renewed")]
    Unauthorized,

    /// The login exchange itself was rejected (bad credentials or an
    /// unusable token envelope); nothing was stored.
    #[error("Login failed: {0}")]
    LoginRejected(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Back off to a char boundary; byte 500 may fall inside a
        // multibyte character.
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
