use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::error;

use crate::config;
use crate::models::ErrorResponse;
use crate::services::auth_service::{get_auth_token, validate_jwt};

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::UNAUTHORIZED;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: message.to_string(),
        }),
    )
}

/// Guard for the authenticated API routes: the request must carry a bearer
/// token (Authorization header or `auth_token` cookie) that verifies against
/// the shared secret and names a user. The user id lands in the request
/// extensions for downstream handlers.
pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(unauthorized("Missing bearer token")),
    };

    // 2. Validate the token
    let config = config::get_config();
    let secret = match &config.auth_jwt_secret {
        Some(secret) => secret,
        None => {
            error!("auth_jwt_secret not configured");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            return Err((
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    status: status.to_string(),
                    error: "Authentication not configured".to_string(),
                }),
            ));
        }
    };
    let token_data = match validate_jwt(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            error!("JWT validation failed: {}", e);
            return Err(unauthorized("Invalid token"));
        }
    };

    // 3. Extract the user id claim
    let user_id = match token_data.claims.get("userid").and_then(|v| v.as_str()) {
        Some(uid) => uid.to_string(),
        None => {
            error!("JWT token does not contain 'userid' claim");
            return Err(unauthorized("Invalid token"));
        }
    };

    // 4. Expose the user id to downstream handlers
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}
