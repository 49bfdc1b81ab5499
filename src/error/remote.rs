use thiserror::Error;

/// Failure reported by an authoritative backend.
///
/// Transport-level failures (unreachable, erroring, garbled) send mutations
/// to the fallback tier. `Conflict` and `NotFound` are answers from a live
/// backend and are surfaced instead.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("remote store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid remote payload: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn falls_back(&self) -> bool {
        !matches!(self, RemoteError::Conflict(_) | RemoteError::NotFound(_))
    }
}

impl From<sqlx::Error> for RemoteError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => RemoteError::NotFound("row".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RemoteError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RemoteError::NotFound(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { source, .. } => RemoteError::Decode(source.to_string()),
            sqlx::Error::Decode(source) => RemoteError::Decode(source.to_string()),
            other => RemoteError::Unavailable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return RemoteError::Decode(error.to_string());
        }
        match error.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                RemoteError::NotFound(error.to_string())
            }
            Some(status) if status == reqwest::StatusCode::CONFLICT => {
                RemoteError::Conflict(error.to_string())
            }
            Some(status) => RemoteError::Rejected {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => RemoteError::Unavailable(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(error: serde_json::Error) -> Self {
        RemoteError::Decode(error.to_string())
    }
}
