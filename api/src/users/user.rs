use chrono::NaiveDate;
use gym_shared::MembershipType;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow};

use crate::error::AppResult;

/// A gym member. The password hash stays in the database and is never
/// loaded into this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub membership_type: Option<MembershipType>,
    pub membership_start_date: Option<NaiveDate>,
    pub membership_end_date: Option<NaiveDate>,
    pub remaining_days: i64,
}

impl User {
    pub async fn from_id<'e>(id: i64, db: impl SqliteExecutor<'e>) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, membership_type, membership_start_date,
                   membership_end_date, remaining_days
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    pub fn remaining_days_on(&self, today: NaiveDate) -> i64 {
        gym_shared::remaining_days(self.remaining_days, self.membership_end_date, today)
    }

    pub fn status_on(self, today: NaiveDate) -> MembershipStatus {
        MembershipStatus {
            effective_remaining_days: self.remaining_days_on(today),
            active: self.membership_end_date.is_some_and(|end| end >= today),
            user: self,
        }
    }
}

/// A user together with what their membership is worth today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipStatus {
    #[serde(flatten)]
    pub user: User,
    pub effective_remaining_days: i64,
    pub active: bool,
}
