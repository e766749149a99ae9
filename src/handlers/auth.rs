use crate::handlers::{bad_request, internal_error, unauthorized, ApiError};
use crate::models::auth::*;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

/// Fixed token accepted for the seeded guest account (no-auth mode).
pub const GUEST_TOKEN: &str = "guest-token";

/// Starting credit balance for new accounts.
const SIGNUP_CREDITS: i32 = 100;

const TOKEN_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if payload.email.is_empty() || !payload.email.contains('@') {
        return Err(bad_request("A valid email address is required"));
    }
    if payload.password.len() < 8 {
        return Err(bad_request("Password must be at least 8 characters long"));
    }
    if payload.name.trim().is_empty() {
        return Err(bad_request("Name is required"));
    }

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error checking existing user: {}", e);
            internal_error()
        })?;

    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Email already registered")),
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        internal_error()
    })?;

    // The pre-check above can race a concurrent registration; the UNIQUE
    // constraint on users.email is the arbiter, so its violation still maps
    // to 409 rather than 500.
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, name, subscription_tier, credits_balance)
         VALUES ($1, $2, $3, 'free', $4)
         RETURNING *",
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(payload.name.trim())
    .bind(SIGNUP_CREDITS)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("Email already registered")),
            );
        }
        tracing::error!("Error creating user: {}", e);
        internal_error()
    })?;

    tracing::info!(user_id = %user.id, "Registered new user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(bad_request("Email and password are required"));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error finding user: {}", e);
            internal_error()
        })?
        .ok_or_else(|| unauthorized("Invalid credentials"))?;

    let valid = verify(&payload.password, &user.password_hash).map_err(|e| {
        tracing::error!("Error verifying password: {}", e);
        internal_error()
    })?;

    if !valid {
        return Err(unauthorized("Invalid credentials"));
    }

    let token = generate_jwt_token(&user)?;

    Ok(Json(LoginResponse {
        token,
        expires_in: TOKEN_EXPIRY_SECONDS as u64,
        user: UserResponse::from(user),
    }))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "storyreel-dev-secret".to_string()
    })
}

pub fn generate_jwt_token(user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        exp: (now + Duration::seconds(TOKEN_EXPIRY_SECONDS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Error generating JWT: {}", e);
        internal_error()
    })
}

pub fn verify_jwt_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Claims for the seeded guest account (nil UUID, effectively unlimited credits).
pub fn guest_claims() -> Claims {
    let now = Utc::now();
    Claims {
        sub: Uuid::nil().to_string(),
        email: "guest@example.com".to_string(),
        name: "Guest User".to_string(),
        exp: (now + Duration::days(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            name: "Ada".to_string(),
            subscription_tier: "free".to_string(),
            credits_balance: 100,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let user = test_user();
        let token = generate_jwt_token(&user).expect("token should be issued");
        let claims = verify_jwt_token(&token).expect("token should verify");
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let user = test_user();
        let mut token = generate_jwt_token(&user).unwrap();
        token.push('x');
        assert!(verify_jwt_token(&token).is_err());
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn guest_claims_use_the_nil_user_id() {
        let claims = guest_claims();
        assert_eq!(claims.user_id().unwrap(), Uuid::nil());
    }
}
