use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow};

use crate::error::AppResult;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Promotion {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_path: String,
    pub created_at: NaiveDateTime,
}

impl Promotion {
    pub async fn from_id<'e>(id: i64, db: impl SqliteExecutor<'e>) -> AppResult<Option<Self>> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, title, description, image_path, created_at
            FROM promotions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(promotion)
    }
}
