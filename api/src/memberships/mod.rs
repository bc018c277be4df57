//! The membership ledger: how many days a member has left, what a
//! check-in costs, and what a renewal resets.

mod attendance;

pub use attendance::*;

use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use gym_shared::MembershipType;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, SqliteConnection, SqlitePool};

use crate::{
    auth::MemberSession,
    error::{AppError, AppResult},
    notifications::{self, Notification},
    now,
    sqlite::Database,
    today,
    users::User,
    AppState,
};

/// Days one check-in takes off the counter.
pub const ATTENDANCE_STEP: i64 = 1;

/// Effective days left for a member, see [`gym_shared::remaining_days`].
pub async fn remaining_days<'e>(
    user_id: i64,
    today: NaiveDate,
    db: impl SqliteExecutor<'e>,
) -> AppResult<i64> {
    let user = User::from_id(user_id, db)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(user.remaining_days_on(today))
}

/// Records a check-in dated `today` and takes `step` days off the stored
/// counter, never going below zero. Both writes commit together or not at
/// all.
#[tracing::instrument(skip(db))]
pub async fn record_attendance(
    user_id: i64,
    today: NaiveDate,
    step: i64,
    db: &SqlitePool,
) -> AppResult<Attendance> {
    let mut tx = db.begin().await?;
    let attendance = record_attendance_in(user_id, today, step, &mut tx).await?;
    tx.commit().await?;

    tracing::info!(user_id, "Attendance recorded");
    Ok(attendance)
}

/// [`record_attendance`] on a connection whose transaction the caller owns.
pub async fn record_attendance_in(
    user_id: i64,
    today: NaiveDate,
    step: i64,
    conn: &mut SqliteConnection,
) -> AppResult<Attendance> {
    if User::from_id(user_id, &mut *conn).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }

    let attendance = sqlx::query_as::<_, Attendance>(
        r#"
        INSERT INTO attendances (user_id, attendance_date)
        VALUES (?, ?)
        RETURNING id, user_id, attendance_date
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE users SET remaining_days = MAX(remaining_days - ?, 0) WHERE id = ?")
        .bind(step)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(attendance)
}

pub async fn attendance_history<'e>(
    user_id: i64,
    db: impl SqliteExecutor<'e>,
) -> AppResult<Vec<Attendance>> {
    let history = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, user_id, attendance_date
        FROM attendances
        WHERE user_id = ?
        ORDER BY attendance_date DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(history)
}

/// Outcome of a renewal: the new window and the notification announcing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Renewal {
    pub user_id: i64,
    pub membership_type: MembershipType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub remaining_days: i64,
    pub notification: Notification,
}

/// Starts a fresh membership window for `user_id` beginning `today`.
///
/// The counter is reset to the window length; unused days from the
/// previous window are dropped, not carried over. `amount` is not checked
/// against any price list. An unrecognised type fails before anything is
/// written.
#[tracing::instrument(skip(db))]
pub async fn renew_membership(
    user_id: i64,
    membership_type: &str,
    amount: f64,
    today: NaiveDate,
    db: &SqlitePool,
) -> AppResult<Renewal> {
    let membership_type: MembershipType = membership_type.parse()?;

    let mut tx = db.begin().await?;
    let renewal = renew_membership_in(user_id, membership_type, amount, today, &mut tx).await?;
    tx.commit().await?;

    Ok(renewal)
}

/// [`renew_membership`] on a connection whose transaction the caller owns.
pub async fn renew_membership_in(
    user_id: i64,
    membership_type: MembershipType,
    amount: f64,
    today: NaiveDate,
    conn: &mut SqliteConnection,
) -> AppResult<Renewal> {
    let (start_date, end_date) = membership_type.window_from(today);
    let remaining_days = membership_type.duration_days();

    let updated = sqlx::query(
        r#"
        UPDATE users
        SET membership_type = ?,
            membership_start_date = ?,
            membership_end_date = ?,
            remaining_days = ?
        WHERE id = ?
        "#,
    )
    .bind(membership_type)
    .bind(start_date)
    .bind(end_date)
    .bind(remaining_days)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }

    let message = format!(
        "Your {} membership expires on {}",
        membership_type,
        end_date.format("%Y-%m-%d")
    );
    let notification =
        notifications::create(user_id, &message, now(), &mut *conn).await?;

    tracing::info!(
        user_id,
        %membership_type,
        amount,
        duration = remaining_days,
        "Membership renewed"
    );

    Ok(Renewal {
        user_id,
        membership_type,
        start_date,
        end_date,
        remaining_days,
        notification,
    })
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn check_in(
    State(db): State<Database>,
    member: MemberSession,
) -> AppResult<impl IntoResponse> {
    let attendance = record_attendance(member.user_id(), today(), ATTENDANCE_STEP, db.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(attendance)))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_attendance(
    State(db): State<Database>,
    member: MemberSession,
) -> AppResult<Json<Vec<Attendance>>> {
    let history = attendance_history(member.user_id(), db.as_ref()).await?;
    Ok(Json(history))
}
