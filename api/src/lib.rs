pub mod auth;
pub mod error;
pub mod memberships;
pub mod notifications;
pub mod payments;
pub mod promotions;
pub mod settings;
pub mod sqlite;
pub mod stats;
pub mod storage;
pub mod users;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};

use settings::Settings;
use sqlite::Database;
use storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: ImageStore,
    pub auth: auth::Settings,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for ImageStore {
    fn from_ref(state: &AppState) -> Self {
        state.images.clone()
    }
}

impl FromRef<AppState> for auth::Settings {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// The gym's wall clock. Membership dates, notification and promotion
/// timestamps all read it, so they agree on what day it is.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// The calendar day every membership computation is anchored to.
pub fn today() -> NaiveDate {
    now().date()
}

pub async fn create_state(settings: &Settings) -> Result<AppState> {
    let pool = sqlite::create_pool(&settings.sqlite).await?;

    Ok(AppState {
        db: Database::new(pool),
        images: ImageStore::new(&settings.storage),
        auth: settings.auth.clone(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/me", get(users::me))
        .route(
            "/attendance",
            get(memberships::get_attendance).post(memberships::check_in),
        )
        .route("/notifications", get(notifications::get_unread))
        .route(
            "/notifications/{id}/read",
            post(notifications::read_notification),
        )
        .route("/payments", post(payments::post_payment))
        .route("/payments/mine", get(payments::get_my_payments))
        .route("/payments/pending", get(payments::get_pending))
        .route("/payments/history", get(payments::get_history))
        .route("/payments/{id}/approve", post(payments::approve_payment))
        .route("/payments/{id}/reject", post(payments::reject_payment))
        .route(
            "/promotions",
            get(promotions::get_promotions).post(promotions::post_promotion),
        )
        .route("/users", get(users::get_users))
        .route(
            "/users/{id}",
            get(users::get_user_by_id).put(users::put_user),
        )
        .route(
            "/users/{id}/attendance",
            get(users::get_user_attendance).post(users::check_in_user),
        )
        .route("/stats", get(stats::get_statistics))
        .merge(auth::router())
        .layer(DefaultBodyLimit::max(storage::MAX_UPLOAD_BODY))
        .with_state(state)
}

pub async fn create_app(settings: &Settings) -> Result<Router> {
    let state = create_state(settings).await?;
    Ok(router(state))
}
