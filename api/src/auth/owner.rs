use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::hash_password;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub username: String,
}

/// One-time bootstrap of the gym's single owner account.
///
/// The insert and the "no owner yet" check are one statement, so two
/// concurrent bootstraps cannot both succeed.
#[tracing::instrument(skip(password, db))]
pub async fn register_owner(username: &str, password: &str, db: &SqlitePool) -> AppResult<Owner> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Please fill in every field"));
    }

    let password_hash = hash_password(password)?;

    let owner = sqlx::query_as::<_, Owner>(
        r#"
        INSERT INTO owners (username, password_hash)
        SELECT ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM owners)
        RETURNING id, username
        "#,
    )
    .bind(username)
    .bind(&password_hash)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::conflict("An owner already exists"))?;

    tracing::info!(owner_id = owner.id, "Registered owner");
    Ok(owner)
}
