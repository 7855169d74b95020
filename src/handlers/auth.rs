// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, CurrentUser, LoginRequest, NewUser},
    store::UserStore,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user identity (excluding password).
pub async fn register(
    State(users): State<Arc<dyn UserStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = users
        .create_user(NewUser {
            email: normalize_email(&payload.email),
            display_name: payload.full_name.trim().to_string(),
            password_hash: hashed_password,
        })
        .await
        .map_err(|e| {
            tracing::warn!("Failed to register user: {}", e);
            AppError::from(e)
        })?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(CurrentUser::from(user))))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the user store.
/// If valid, signs a JWT token with the user's ID and email.
pub async fn login(
    State(users): State<Arc<dyn UserStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = users
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(user.id, &user.email, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Returns the authenticated caller.
pub async fn me(
    State(users): State<Arc<dyn UserStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .find_user(claims.user_id()?)
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    Ok(Json(CurrentUser::from(user)))
}
