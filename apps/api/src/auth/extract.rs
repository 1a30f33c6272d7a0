use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::jwt::RECRUITER_ROLE_ID;
use crate::errors::AppError;
use crate::state::AppState;

/// Caller identity resolved from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role_id: i32,
}

impl AuthUser {
    pub fn is_recruiter(&self) -> bool {
        self.role_id == RECRUITER_ROLE_ID
    }
}

/// Accepts `Bearer <token>` as well as a bare token.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let raw = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let token = match raw.split_once(' ') {
        Some(("Bearer", rest)) => rest.trim(),
        _ if raw == "Bearer" => "",
        _ => raw,
    };
    if token.is_empty() {
        return Err(AppError::Unauthorized("Missing token".to_string()));
    }
    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.validate(token)?;
        Ok(AuthUser {
            user_id: claims.user_id()?,
            role_id: claims.role_id,
        })
    }
}

/// An authenticated caller holding the recruiter role.
#[derive(Debug, Clone)]
pub struct Recruiter(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for Recruiter {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_recruiter() {
            tracing::warn!(user_id = user.user_id, role_id = user.role_id, "recruiter route denied");
            return Err(AppError::Forbidden);
        }
        Ok(Recruiter(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_prefix_stripped() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bare_token_accepted() {
        let parts = parts_with(Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = bearer_token(&parts_with(None)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Missing token"));
    }

    #[test]
    fn test_empty_bearer_is_unauthorized() {
        assert!(bearer_token(&parts_with(Some("Bearer "))).is_err());
    }
}
