use crate::handlers::auth::{guest_claims, verify_jwt_token, GUEST_TOKEN};
use crate::models::auth::ErrorResponse;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let auth_header = match headers.get("Authorization") {
        Some(header) => header,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Missing Authorization header")),
            ));
        }
    };

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(_) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid Authorization header format")),
            ));
        }
    };

    let token = if let Some(token) = auth_str.strip_prefix("Bearer ") {
        token
    } else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
            )),
        ));
    };

    // The seeded guest account works without registration.
    if token == GUEST_TOKEN {
        request.extensions_mut().insert(guest_claims());
        return Ok(next.run(request).await);
    }

    let claims = match verify_jwt_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid or expired token")),
            ));
        }
    };

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
