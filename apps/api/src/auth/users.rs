use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user::{RoleRow, UserRow};

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role_id: i32,
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    Ok(
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn create_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, AppError> {
    let result = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (role_id, name, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, role_id, name, email, password_hash, created_at
        "#,
    )
    .bind(user.role_id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(AppError::Conflict("email already registered".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_role(pool: &PgPool, role_id: i32) -> Result<Option<RoleRow>, AppError> {
    Ok(sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_optional(pool)
        .await?)
}
