mod owner;
mod password;
mod session;

pub use owner::*;
pub use password::*;
pub use session::*;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use gym_shared::Realm;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    sqlite::Database,
    users::User,
    AppState,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session_ttl_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 60 * 60 * 24,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Who a successful login proved to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub realm: Realm,
}

#[derive(Deserialize, Serialize)]
pub struct RegisterParams {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, Serialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    #[serde(default = "default_realm")]
    pub realm: Realm,
}

fn default_realm() -> Realm {
    Realm::Member
}

#[tracing::instrument(skip_all, fields(username = %params.username))]
pub async fn register_member(params: &RegisterParams, db: &SqlitePool) -> AppResult<User> {
    let username = params.username.trim();
    if username.is_empty() || params.password.is_empty() || params.confirm_password.is_empty() {
        return Err(AppError::validation("Please fill in every field"));
    }
    if params.password != params.confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    let password_hash = hash_password(&params.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash)
        SELECT ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM users WHERE username = ?)
        RETURNING id, username, membership_type, membership_start_date,
                  membership_end_date, remaining_days
        "#,
    )
    .bind(username)
    .bind(&password_hash)
    .bind(username)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::conflict("That username is already taken"))?;

    tracing::info!(user_id = user.id, "Registered member");
    Ok(user)
}

/// Checks a password against the realm's identity table.
///
/// An unknown username and a wrong password fail identically. Usernames
/// are trimmed the same way registration trims them.
#[tracing::instrument(skip(password, db))]
pub async fn authenticate(
    username: &str,
    password: &str,
    realm: Realm,
    db: &SqlitePool,
) -> AppResult<Identity> {
    let username = username.trim();
    let sql = match realm {
        Realm::Member => "SELECT id, username, password_hash FROM users WHERE username = ?",
        Realm::Owner => "SELECT id, username, password_hash FROM owners WHERE username = ?",
    };
    let row = sqlx::query_as::<_, (i64, String, String)>(sql)
        .bind(username)
        .fetch_optional(db)
        .await?;

    match row {
        Some((id, username, password_hash)) if verify_password(password, &password_hash) => {
            Ok(Identity {
                id,
                username,
                realm,
            })
        }
        Some(_) => Err(AppError::InvalidCredentials),
        None => {
            verify_against_dummy(password);
            Err(AppError::InvalidCredentials)
        }
    }
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip_all, fields(username = %params.username))]
pub async fn register(
    State(db): State<Database>,
    Json(params): Json<RegisterParams>,
) -> AppResult<impl IntoResponse> {
    let user = register_member(&params, db.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip_all, fields(username = %params.username, realm = %params.realm))]
pub async fn login(
    State(db): State<Database>,
    State(settings): State<Settings>,
    Json(params): Json<LoginParams>,
) -> AppResult<Json<Session>> {
    if params.username.trim().is_empty() || params.password.is_empty() {
        return Err(AppError::validation("Please fill in every field"));
    }

    let identity = authenticate(&params.username, &params.password, params.realm, db.as_ref())
        .await
        .inspect_err(|e| tracing::info!("Login refused: {}", e))?;
    let session = Session::create(&identity, settings.session_ttl_seconds, db.as_ref()).await?;

    Ok(Json(session))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn logout(State(db): State<Database>, session: Session) -> AppResult<StatusCode> {
    session.revoke(db.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}
