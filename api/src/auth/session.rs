use std::fmt;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_auth::AuthBearer;
use chrono::Utc;
use gym_shared::Realm;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteExecutor, FromRow, SqlitePool};
use uuid::Uuid;

use super::Identity;
use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// A logged-in member or owner, resolved from the request's bearer token.
///
/// Every operation that acts on behalf of someone takes one of these
/// instead of reading a process-wide "current user".
#[derive(Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub token: String,
    pub realm: Realm,
    pub identity_id: i64,
    pub username: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("realm", &self.realm)
            .field("identity_id", &self.identity_id)
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub async fn create(identity: &Identity, ttl_seconds: i64, db: &SqlitePool) -> AppResult<Self> {
        let created_at = Utc::now().timestamp();
        let session = Self {
            token: [Uuid::new_v4().to_string(), Uuid::new_v4().to_string()].join("_"),
            realm: identity.realm,
            identity_id: identity.id,
            username: identity.username.clone(),
            created_at,
            expires_at: created_at + ttl_seconds,
        };

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, realm, identity_id, username, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(session.realm)
        .bind(session.identity_id)
        .bind(&session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(realm = %session.realm, identity_id = session.identity_id, "Session started");
        Ok(session)
    }

    /// Looks up a live session; expired tokens resolve to `None`.
    pub async fn from_token<'e>(token: &str, db: impl SqliteExecutor<'e>) -> AppResult<Option<Self>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, realm, identity_id, username, created_at, expires_at
            FROM sessions
            WHERE token = ? AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(Utc::now().timestamp())
        .fetch_optional(db)
        .await?;

        Ok(session)
    }

    pub async fn revoke(&self, db: &SqlitePool) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(&self.token)
            .execute(db)
            .await?;
        Ok(())
    }

    pub fn require(self, realm: Realm) -> AppResult<Self> {
        if self.realm == realm {
            Ok(self)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthBearer(token) = AuthBearer::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        Session::from_token(&token, state.db.as_ref())
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

/// A session that belongs to a gym member.
#[derive(Debug, Clone)]
pub struct MemberSession(pub Session);

impl MemberSession {
    pub fn user_id(&self) -> i64 {
        self.0.identity_id
    }
}

impl FromRequestParts<AppState> for MemberSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session.require(Realm::Member).map(Self)
    }
}

/// A session that belongs to the gym owner.
#[derive(Debug, Clone)]
pub struct OwnerSession(pub Session);

impl FromRequestParts<AppState> for OwnerSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session.require(Realm::Owner).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::create_test_app;

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_expired_session_is_rejected() {
        let app = create_test_app().await;
        let identity = Identity {
            id: 1,
            username: "ana".to_string(),
            realm: Realm::Member,
        };

        let live = Session::create(&identity, 60, app.db()).await.unwrap();
        let expired = Session::create(&identity, -1, app.db()).await.unwrap();

        assert!(Session::from_token(&live.token, app.db())
            .await
            .unwrap()
            .is_some());
        assert!(Session::from_token(&expired.token, app.db())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let session = Session {
            token: "secret-token".to_string(),
            realm: Realm::Owner,
            identity_id: 1,
            username: "boss".to_string(),
            created_at: 0,
            expires_at: 1,
        };
        assert!(!format!("{:?}", session).contains("secret-token"));
    }

    #[test]
    fn test_require_realm() {
        let session = Session {
            token: String::new(),
            realm: Realm::Member,
            identity_id: 1,
            username: "ana".to_string(),
            created_at: 0,
            expires_at: 1,
        };
        assert!(session.clone().require(Realm::Member).is_ok());
        assert!(matches!(
            session.require(Realm::Owner),
            Err(AppError::Forbidden)
        ));
    }
}
