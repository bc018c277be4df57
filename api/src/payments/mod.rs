//! Payment review: members submit proof, the owner approves or rejects it.
//! Approval renews the membership in the same transaction.

mod payment;

pub use payment::*;

use axum::{
    debug_handler,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use gym_shared::{ImagePolicy, MembershipType, PaymentStatus, Verdict};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::{MemberSession, OwnerSession},
    error::{AppError, AppResult},
    memberships::{self, Renewal},
    sqlite::Database,
    storage::{ImageStore, ImageUpload, UploadForm, PAYMENT_FOLDER},
    today, AppState,
};

#[derive(Debug)]
pub struct SubmitPaymentParams {
    pub amount: f64,
    pub payment_type: String,
    pub proof: ImageUpload,
}

impl SubmitPaymentParams {
    /// Reads the `amount`, `payment_type` and `proof` fields of a
    /// multipart submission.
    pub async fn from_multipart(multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::read(multipart).await?;
        let amount = form
            .text("amount")?
            .parse::<f64>()
            .map_err(|_| AppError::validation("The amount must be a positive number"))?;

        Ok(Self {
            amount,
            payment_type: form.text("payment_type")?.to_string(),
            proof: form.take_file("proof")?,
        })
    }
}

/// Result of approving a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub payment: Payment,
    pub renewal: Renewal,
}

#[tracing::instrument(skip(db, images))]
pub async fn submit_payment(
    member: &MemberSession,
    params: SubmitPaymentParams,
    today: NaiveDate,
    db: &SqlitePool,
    images: &ImageStore,
) -> AppResult<Payment> {
    let payment_type: MembershipType = params.payment_type.parse()?;
    if !params.amount.is_finite() || params.amount <= 0.0 {
        return Err(AppError::validation("The amount must be a positive number"));
    }

    let stored = images
        .store(&params.proof, PAYMENT_FOLDER, ImagePolicy::PaymentProof)
        .await?;
    let image_path = stored.to_string_lossy();

    let inserted = insert_pending(
        member.user_id(),
        params.amount,
        today,
        payment_type,
        &image_path,
        db,
    )
    .await;

    match inserted {
        Ok(payment) => {
            tracing::info!(
                payment_id = payment.id,
                user_id = payment.user_id,
                amount = payment.amount,
                %payment_type,
                "Payment submitted"
            );
            Ok(payment)
        }
        Err(e) => {
            // nothing was committed, so the image has no row pointing at it
            images.discard(&stored).await;
            Err(e)
        }
    }
}

/// Inserts a pending payment and reads it back; commits only once the row
/// has been read successfully.
async fn insert_pending(
    user_id: i64,
    amount: f64,
    payment_date: NaiveDate,
    payment_type: MembershipType,
    image_path: &str,
    db: &SqlitePool,
) -> AppResult<Payment> {
    let mut tx = db.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO payments (user_id, amount, payment_date, payment_type, image_path, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(payment_date)
    .bind(payment_type)
    .bind(image_path)
    .bind(PaymentStatus::Pending)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let payment = Payment::from_id(id, &mut *tx)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;
    tx.commit().await?;

    Ok(payment)
}

/// Pending payments, newest first.
pub async fn list_pending(_owner: &OwnerSession, db: &SqlitePool) -> AppResult<Vec<PaymentWithUser>> {
    let payments = sqlx::query_as::<_, PaymentWithUser>(
        r#"
        SELECT p.id, p.user_id, u.username, p.amount, p.payment_date,
               p.payment_type, p.image_path, p.status
        FROM payments p
        JOIN users u ON p.user_id = u.id
        WHERE p.status = ?
        ORDER BY p.payment_date DESC, p.id DESC
        "#,
    )
    .bind(PaymentStatus::Pending)
    .fetch_all(db)
    .await?;

    Ok(payments)
}

/// Every payment regardless of status, newest first.
pub async fn payment_history(
    _owner: &OwnerSession,
    db: &SqlitePool,
) -> AppResult<Vec<PaymentWithUser>> {
    let payments = sqlx::query_as::<_, PaymentWithUser>(
        r#"
        SELECT p.id, p.user_id, u.username, p.amount, p.payment_date,
               p.payment_type, p.image_path, p.status
        FROM payments p
        JOIN users u ON p.user_id = u.id
        ORDER BY p.payment_date DESC, p.id DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(payments)
}

pub async fn member_payments(member: &MemberSession, db: &SqlitePool) -> AppResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, user_id, amount, payment_date, payment_type, image_path, status
        FROM payments
        WHERE user_id = ?
        ORDER BY payment_date DESC, id DESC
        "#,
    )
    .bind(member.user_id())
    .fetch_all(db)
    .await?;

    Ok(payments)
}

/// Settles a pending payment with `verdict`.
///
/// The status check and the write are one statement, so of two racing
/// reviews only one sees the payment as pending.
async fn transition(
    payment_id: i64,
    verdict: Verdict,
    conn: &mut SqliteConnection,
) -> AppResult<Payment> {
    let updated = sqlx::query("UPDATE payments SET status = ? WHERE id = ? AND status = ?")
        .bind(verdict.outcome())
        .bind(payment_id)
        .bind(PaymentStatus::Pending)
        .execute(&mut *conn)
        .await?;

    let payment = Payment::from_id(payment_id, &mut *conn)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;

    match updated.rows_affected() {
        0 => Err(AppError::conflict(format!(
            "Payment {} is already {}",
            payment_id, payment.status
        ))),
        _ => Ok(payment),
    }
}

/// Approves a pending payment and renews the submitter's membership with
/// the payment's type. Either both happen or neither does.
///
/// The amount is passed through to the renewal as-is; it is not compared
/// with any price.
#[tracing::instrument(skip(db))]
pub async fn approve(
    owner: &OwnerSession,
    payment_id: i64,
    today: NaiveDate,
    db: &SqlitePool,
) -> AppResult<Approval> {
    let mut tx = db.begin().await?;
    let payment = transition(payment_id, Verdict::Approve, &mut tx).await?;
    let renewal = memberships::renew_membership_in(
        payment.user_id,
        payment.payment_type,
        payment.amount,
        today,
        &mut tx,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        payment_id,
        user_id = payment.user_id,
        owner = %owner.0.username,
        "Payment approved"
    );
    Ok(Approval { payment, renewal })
}

#[tracing::instrument(skip(db))]
pub async fn reject(owner: &OwnerSession, payment_id: i64, db: &SqlitePool) -> AppResult<Payment> {
    let mut tx = db.begin().await?;
    let payment = transition(payment_id, Verdict::Reject, &mut tx).await?;
    tx.commit().await?;

    tracing::info!(
        payment_id,
        user_id = payment.user_id,
        owner = %owner.0.username,
        "Payment rejected"
    );
    Ok(payment)
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db, images, multipart))]
pub async fn post_payment(
    State(db): State<Database>,
    State(images): State<ImageStore>,
    member: MemberSession,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let params = SubmitPaymentParams::from_multipart(multipart).await?;
    let payment = submit_payment(&member, params, today(), db.as_ref(), &images).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_my_payments(
    State(db): State<Database>,
    member: MemberSession,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(member_payments(&member, db.as_ref()).await?))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_pending(
    State(db): State<Database>,
    owner: OwnerSession,
) -> AppResult<Json<Vec<PaymentWithUser>>> {
    Ok(Json(list_pending(&owner, db.as_ref()).await?))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn get_history(
    State(db): State<Database>,
    owner: OwnerSession,
) -> AppResult<Json<Vec<PaymentWithUser>>> {
    Ok(Json(payment_history(&owner, db.as_ref()).await?))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn approve_payment(
    State(db): State<Database>,
    owner: OwnerSession,
    Path(id): Path<i64>,
) -> AppResult<Json<Approval>> {
    Ok(Json(approve(&owner, id, today(), db.as_ref()).await?))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(db))]
pub async fn reject_payment(
    State(db): State<Database>,
    owner: OwnerSession,
    Path(id): Path<i64>,
) -> AppResult<Json<Payment>> {
    Ok(Json(reject(&owner, id, db.as_ref()).await?))
}
