//! Session error types.

use reel_models::RunId;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Run not found: {0}")]
    NotFound(RunId),
}

impl SessionError {
    pub fn not_found(id: &RunId) -> Self {
        Self::NotFound(id.clone())
    }
}
