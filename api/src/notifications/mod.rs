mod notification;

pub use notification::*;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use sqlx::{sqlite::SqliteExecutor, SqliteConnection};

use crate::{
    auth::MemberSession,
    error::{AppError, AppResult},
    sqlite::Database,
    AppState,
};

/// Inserts an unread notification. Runs on the caller's connection so it
/// joins whatever transaction produced it.
pub async fn create(
    user_id: i64,
    message: &str,
    sent_at: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> AppResult<Notification> {
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, message, sent_at)
        VALUES (?, ?, ?)
        RETURNING id, user_id, message, sent_at, is_read
        "#,
    )
    .bind(user_id)
    .bind(message)
    .bind(sent_at)
    .fetch_one(conn)
    .await?;

    tracing::info!(user_id, "Notification created: {}", message);
    Ok(notification)
}

pub async fn unread<'e>(user_id: i64, db: impl SqliteExecutor<'e>) -> AppResult<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, message, sent_at, is_read
        FROM notifications
        WHERE user_id = ? AND is_read = 0
        ORDER BY sent_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(notifications)
}

/// Marks one of `user_id`'s notifications as read. Someone else's
/// notification is reported as missing.
pub async fn mark_read<'e>(
    user_id: i64,
    notification_id: i64,
    db: impl SqliteExecutor<'e>,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .execute(db)
        .await?;

    match result.rows_affected() {
        0 => Err(AppError::NotFound("Notification")),
        _ => Ok(()),
    }
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_unread(
    State(db): State<Database>,
    member: MemberSession,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = unread(member.user_id(), db.as_ref()).await?;
    Ok(Json(notifications))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn read_notification(
    State(db): State<Database>,
    member: MemberSession,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    mark_read(member.user_id(), id, db.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}
