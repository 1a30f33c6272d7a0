use sqlx::PgPool;

use crate::auth::jwt::TokenKeys;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// HS256 signing/verification keys derived once from `JWT_SECRET`.
    pub tokens: TokenKeys,
}
