use tracing::error;

use crate::services::auth_service::validate_jwt;

/// Why a connection attempt was turned away.
///
/// Deliberately coarse: malformed, expired, and signature-invalid tokens all
/// map to `InvalidToken` so the close reason leaks nothing about the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    MissingToken,
    InvalidToken,
}

impl AdmissionError {
    /// Reason string carried by the 1008 policy-violation close frame.
    pub fn close_reason(&self) -> &'static str {
        match self {
            AdmissionError::MissingToken => "Token missing",
            AdmissionError::InvalidToken => "Invalid token",
        }
    }
}

/// Authenticate a websocket connection attempt.
///
/// The bearer token must verify against the shared secret and carry a
/// non-empty `userid` claim. Returns the authenticated user id.
pub fn authenticate(token: Option<&str>, secret: Option<&str>) -> Result<String, AdmissionError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AdmissionError::MissingToken)?;

    let secret = match secret {
        Some(s) => s,
        None => {
            error!("auth_jwt_secret not configured, rejecting connection");
            return Err(AdmissionError::InvalidToken);
        }
    };

    let token_data = validate_jwt(token, secret).map_err(|_| AdmissionError::InvalidToken)?;

    match token_data.claims.get("userid").and_then(|v| v.as_str()) {
        Some(uid) if !uid.is_empty() => Ok(uid.to_string()),
        _ => Err(AdmissionError::InvalidToken),
    }
}
