mod user;

use serde::{Deserialize, Serialize};
pub use user::*;

use crate::{
    auth::{MemberSession, OwnerSession},
    error::{AppError, AppResult},
    memberships::{self, Attendance, ATTENDANCE_STEP},
    sqlite::Database,
    today,
};
use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use gym_shared::MembershipType;
use sqlx::{sqlite::SqliteExecutor, SqlitePool};

use crate::AppState;

pub async fn list_users<'e>(db: impl SqliteExecutor<'e>) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, membership_type, membership_start_date,
               membership_end_date, remaining_days
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(users)
}

/// Owner-side manual correction of a member's membership fields.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateUserParams {
    pub membership_type: Option<String>,
    pub membership_end_date: Option<NaiveDate>,
    pub remaining_days: Option<i64>,
}

#[tracing::instrument(skip(db))]
pub async fn update_user(id: i64, params: UpdateUserParams, db: &SqlitePool) -> AppResult<User> {
    let membership_type = params
        .membership_type
        .as_deref()
        .map(str::parse::<MembershipType>)
        .transpose()?;
    if params.remaining_days.is_some_and(|days| days < 0) {
        return Err(AppError::validation("Remaining days cannot be negative"));
    }
    if membership_type.is_none()
        && params.membership_end_date.is_none()
        && params.remaining_days.is_none()
    {
        return Err(AppError::validation("Nothing to update"));
    }

    let mut query = sqlx::QueryBuilder::new(
        r#"
        UPDATE users SET 
        "#,
    );
    let mut separated = query.separated(", ");
    if let Some(membership_type) = membership_type {
        separated.push("membership_type = ");
        separated.push_bind_unseparated(membership_type);
    }
    if let Some(end_date) = params.membership_end_date {
        separated.push("membership_end_date = ");
        separated.push_bind_unseparated(end_date);
    }
    if let Some(remaining_days) = params.remaining_days {
        separated.push("remaining_days = ");
        separated.push_bind_unseparated(remaining_days);
    }
    query.push(" WHERE id = ");
    query.push_bind(id);
    tracing::debug!("Query: {}", query.sql());
    let result = query.build().execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = id, "User updated by owner");

    User::from_id(id, db)
        .await?
        .ok_or(AppError::NotFound("User"))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn me(
    State(db): State<Database>,
    member: MemberSession,
) -> AppResult<Json<MembershipStatus>> {
    let user = User::from_id(member.user_id(), db.as_ref())
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user.status_on(today())))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_users(
    State(db): State<Database>,
    _owner: OwnerSession,
) -> AppResult<Json<Vec<MembershipStatus>>> {
    let today = today();
    let users = list_users(db.as_ref())
        .await?
        .into_iter()
        .map(|user| user.status_on(today))
        .collect::<Vec<_>>();
    tracing::info!("Fetched {} users", users.len());

    Ok(Json(users))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_user_by_id(
    State(db): State<Database>,
    _owner: OwnerSession,
    Path(id): Path<i64>,
) -> AppResult<Json<MembershipStatus>> {
    let user = User::from_id(id, db.as_ref())
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user.status_on(today())))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn put_user(
    State(db): State<Database>,
    _owner: OwnerSession,
    Path(id): Path<i64>,
    Json(params): Json<UpdateUserParams>,
) -> AppResult<Json<User>> {
    let user = update_user(id, params, db.as_ref()).await?;
    Ok(Json(user))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_user_attendance(
    State(db): State<Database>,
    _owner: OwnerSession,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Attendance>>> {
    if User::from_id(id, db.as_ref()).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }
    let history = memberships::attendance_history(id, db.as_ref()).await?;
    Ok(Json(history))
}

/// Front-desk check-in of a member by the owner.
#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn check_in_user(
    State(db): State<Database>,
    _owner: OwnerSession,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let attendance =
        memberships::record_attendance(id, today(), ATTENDANCE_STEP, db.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(attendance)))
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::auth::test::{create_test_member, create_test_owner};
    use crate::memberships::renew_membership;
    use crate::tests::create_test_app;
    use chrono::Duration;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_me_reports_effective_days() {
        let app = create_test_app().await;
        let (user, session) = create_test_member(&app, "ana").await;
        renew_membership(user.id, "normal", 20.0, today(), app.db())
            .await
            .unwrap();

        let response = app
            .server
            .get("/me")
            .authorization_bearer(&session.token)
            .await;
        response.assert_status_ok();
        let status: MembershipStatus = response.json();
        assert_eq!(status.user.username, "ana");
        assert_eq!(status.user.membership_type, Some(MembershipType::Normal));
        assert_eq!(status.effective_remaining_days, 15);
        assert!(status.active);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_owner_lists_users() {
        let app = create_test_app().await;
        create_test_member(&app, "ana").await;
        create_test_member(&app, "bruno").await;
        let owner = create_test_owner(&app).await;

        let response = app
            .server
            .get("/users")
            .authorization_bearer(&owner.token)
            .await;
        response.assert_status_ok();
        let users: Vec<MembershipStatus> = response.json();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user.username, "ana");
        assert!(!users[0].active);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_owner_edits_user() {
        let app = create_test_app().await;
        let (user, _) = create_test_member(&app, "ana").await;
        let owner = create_test_owner(&app).await;
        let end = today() + Duration::days(3);

        let response = app
            .server
            .put(&format!("/users/{}", user.id))
            .authorization_bearer(&owner.token)
            .json(&UpdateUserParams {
                membership_type: Some("full".to_string()),
                membership_end_date: Some(end),
                remaining_days: Some(10),
            })
            .await;
        response.assert_status_ok();
        let updated: User = response.json();
        assert_eq!(updated.membership_type, Some(MembershipType::Full));
        assert_eq!(updated.membership_end_date, Some(end));
        assert_eq!(updated.remaining_days, 10);

        // the calendar now caps the counter
        let response = app
            .server
            .get(&format!("/users/{}", user.id))
            .authorization_bearer(&owner.token)
            .await;
        let status: MembershipStatus = response.json();
        assert_eq!(status.effective_remaining_days, 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_update_user_validation() {
        let app = create_test_app().await;
        let (user, _) = create_test_member(&app, "ana").await;

        let err = update_user(
            user.id,
            UpdateUserParams {
                membership_type: Some("gold".to_string()),
                ..Default::default()
            },
            app.db(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_user(
            user.id,
            UpdateUserParams {
                remaining_days: Some(-1),
                ..Default::default()
            },
            app.db(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_user(user.id, UpdateUserParams::default(), app.db())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_user(
            999,
            UpdateUserParams {
                remaining_days: Some(1),
                ..Default::default()
            },
            app.db(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_owner_checks_member_in() {
        let app = create_test_app().await;
        let (user, _) = create_test_member(&app, "ana").await;
        let owner = create_test_owner(&app).await;
        renew_membership(user.id, "full", 35.0, today(), app.db())
            .await
            .unwrap();

        app.server
            .post(&format!("/users/{}/attendance", user.id))
            .authorization_bearer(&owner.token)
            .await
            .assert_status(StatusCode::CREATED);

        let response = app
            .server
            .get(&format!("/users/{}/attendance", user.id))
            .authorization_bearer(&owner.token)
            .await;
        let history: Vec<Attendance> = response.json();
        assert_eq!(history.len(), 1);

        let user = User::from_id(user.id, app.db()).await.unwrap().unwrap();
        assert_eq!(user.remaining_days, 29);

        app.server
            .get("/users/999/attendance")
            .authorization_bearer(&owner.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
