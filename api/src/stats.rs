use axum::{debug_handler, extract::State, Json};
use chrono::{Months, NaiveDate};
use gym_shared::PaymentStatus;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{auth::OwnerSession, error::AppResult, sqlite::Database, today, AppState};

/// Owner dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_users: i64,
    /// Users whose membership has not ended yet.
    pub active_users: i64,
    /// Sum of approved payments.
    pub total_income: f64,
    /// Check-ins during the last month.
    pub monthly_attendances: i64,
}

#[tracing::instrument(skip(db))]
pub async fn statistics(
    _owner: &OwnerSession,
    today: NaiveDate,
    db: &SqlitePool,
) -> AppResult<Statistics> {
    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?;

    let active_users = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE membership_end_date >= ?",
    )
    .bind(today)
    .fetch_one(db)
    .await?;

    let total_income = sqlx::query_scalar::<_, f64>(
        "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM payments WHERE status = ?",
    )
    .bind(PaymentStatus::Approved)
    .fetch_one(db)
    .await?;

    let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    let monthly_attendances = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE attendance_date >= ?",
    )
    .bind(month_ago)
    .fetch_one(db)
    .await?;

    Ok(Statistics {
        total_users,
        active_users,
        total_income,
        monthly_attendances,
    })
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_statistics(
    State(db): State<Database>,
    owner: OwnerSession,
) -> AppResult<Json<Statistics>> {
    Ok(Json(statistics(&owner, today(), db.as_ref()).await?))
}
