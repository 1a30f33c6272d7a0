//! Axum route handlers for signup, login and role lookup.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::extract::AuthUser;
use crate::auth::jwt::{CANDIDATE_ROLE_ID, RECRUITER_ROLE_ID};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::users::{self, NewUser};
use crate::errors::AppError;
use crate::models::user::RoleRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid credentials".to_string())
}

impl SignupRequest {
    /// The role to register with. 0 is what older clients send for "no preference".
    fn role_id(&self) -> i32 {
        match self.role_id {
            None | Some(0) => CANDIDATE_ROLE_ID,
            Some(id) => id,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        if !self.email.contains('@') {
            return Err(AppError::Validation("email is not valid".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// POST /sign-up
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let role_id = req.role_id();
    if users::get_role(&state.db, role_id).await?.is_none() {
        return Err(AppError::Validation(format!("role {role_id} does not exist")));
    }
    if role_id == RECRUITER_ROLE_ID {
        warn!(email = %email, "Recruiter account self-registered");
    }

    let password_hash = hash_password(req.password.clone()).await?;
    let user = users::create_user(
        &state.db,
        NewUser {
            name: req.name.trim(),
            email: &email,
            password_hash: &password_hash,
            role_id,
        },
    )
    .await?;

    info!(user_id = user.id, role_id, "User signed up");
    let token = state.tokens.issue(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = users::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(&user)?;
    Ok(Json(AuthResponse { token }))
}

/// GET /roles/:id
pub async fn handle_get_role(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(role_id): Path<i32>,
) -> Result<Json<RoleRow>, AppError> {
    let role = users::get_role(&state.db, role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {role_id} not found")))?;
    Ok(Json(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role_id: None,
        }
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("Ada", "ada@example.com", "pw").validate().is_ok());
        assert!(signup(" ", "ada@example.com", "pw").validate().is_err());
        assert!(signup("Ada", "ada.example.com", "pw").validate().is_err());
        assert!(signup("Ada", "ada@example.com", "").validate().is_err());
    }

    #[test]
    fn test_signup_role_defaults_to_candidate() {
        let mut req = signup("Ada", "ada@example.com", "pw");
        assert_eq!(req.role_id(), CANDIDATE_ROLE_ID);
        req.role_id = Some(0);
        assert_eq!(req.role_id(), CANDIDATE_ROLE_ID);
        req.role_id = Some(RECRUITER_ROLE_ID);
        assert_eq!(req.role_id(), RECRUITER_ROLE_ID);
    }
}
