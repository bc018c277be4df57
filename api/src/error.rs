use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gym_shared::UnknownMembershipType;

/// Everything a gym operation can fail with.
///
/// Storage failures never reach the client verbatim: `Connection` and
/// `Internal` are logged here and answered with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database unavailable: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Missing or expired session")]
    Unauthorized,

    #[error("This account cannot perform that action")]
    Forbidden,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Connection(err) => {
                tracing::error!("Database unavailable: {}", err);
                "The service is temporarily unavailable, please try again".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!("Something went wrong: {:#}", err);
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err)
            }
            err => Self::Internal(err.into()),
        }
    }
}

impl From<UnknownMembershipType> for AppError {
    fn from(err: UnknownMembershipType) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Internal(err.into())
    }
}
