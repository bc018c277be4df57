mod promotion;

pub use promotion::*;

use axum::{
    debug_handler,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gym_shared::ImagePolicy;
use sqlx::{sqlite::SqliteExecutor, SqlitePool};

use crate::{
    auth::{OwnerSession, Session},
    error::{AppError, AppResult},
    now,
    sqlite::Database,
    storage::{ImageStore, ImageUpload, UploadForm, PROMOTION_FOLDER},
    AppState,
};

#[derive(Debug)]
pub struct CreatePromotionParams {
    pub title: String,
    pub description: String,
    pub image: ImageUpload,
}

impl CreatePromotionParams {
    pub async fn from_multipart(multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::read(multipart).await?;
        Ok(Self {
            title: form.text("title")?.to_string(),
            description: form.text("description")?.to_string(),
            image: form.take_file("image")?,
        })
    }
}

#[tracing::instrument(skip(db, images))]
pub async fn create_promotion(
    _owner: &OwnerSession,
    params: CreatePromotionParams,
    db: &SqlitePool,
    images: &ImageStore,
) -> AppResult<Promotion> {
    let title = params.title.trim();
    let description = params.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::validation("Please fill in every field"));
    }

    let stored = images
        .store(&params.image, PROMOTION_FOLDER, ImagePolicy::Promotion)
        .await?;

    match insert_promotion(title, description, &stored.to_string_lossy(), db).await {
        Ok(promotion) => {
            tracing::info!(promotion_id = promotion.id, "New promotion: {}", promotion.title);
            Ok(promotion)
        }
        Err(e) => {
            images.discard(&stored).await;
            Err(e)
        }
    }
}

async fn insert_promotion(
    title: &str,
    description: &str,
    image_path: &str,
    db: &SqlitePool,
) -> AppResult<Promotion> {
    let mut tx = db.begin().await?;

    let id = sqlx::query(
        "INSERT INTO promotions (title, description, image_path, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(description)
    .bind(image_path)
    .bind(now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let promotion = Promotion::from_id(id, &mut *tx)
        .await?
        .ok_or(AppError::NotFound("Promotion"))?;
    tx.commit().await?;

    Ok(promotion)
}

pub async fn list_promotions<'e>(db: impl SqliteExecutor<'e>) -> AppResult<Vec<Promotion>> {
    let promotions = sqlx::query_as::<_, Promotion>(
        r#"
        SELECT id, title, description, image_path, created_at
        FROM promotions
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(promotions)
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db, images, multipart))]
pub async fn post_promotion(
    State(db): State<Database>,
    State(images): State<ImageStore>,
    owner: OwnerSession,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let params = CreatePromotionParams::from_multipart(multipart).await?;
    let promotion = create_promotion(&owner, params, db.as_ref(), &images).await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

/// Open to members and the owner alike.
#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_promotions(
    State(db): State<Database>,
    _session: Session,
) -> AppResult<Json<Vec<Promotion>>> {
    Ok(Json(list_promotions(db.as_ref()).await?))
}
