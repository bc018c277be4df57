use chrono::NaiveDate;
use gym_shared::{MembershipType, PaymentStatus};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow};

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_type: MembershipType,
    pub image_path: String,
    pub status: PaymentStatus,
}

impl Payment {
    pub async fn from_id<'e>(id: i64, db: impl SqliteExecutor<'e>) -> AppResult<Option<Self>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, amount, payment_date, payment_type, image_path, status
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(payment)
    }
}

/// A payment as the owner reviews it, with the submitter's username.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentWithUser {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_type: MembershipType,
    pub image_path: String,
    pub status: PaymentStatus,
}
