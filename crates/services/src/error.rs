//! Shared error types for the services crate.

use thiserror::Error;

use flag_core::model::TransitionError;
use storage::repository::StorageError;

/// Errors emitted by the remote session service client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("service rejected the request ({status}): {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid service url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("token storage failed: {0}")]
    Token(#[from] StorageError),
    #[error("{0}")]
    Rejected(String),
}

/// Errors emitted by `QuizEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("no skips remaining")]
    NoSkipsRemaining,
    #[error("no active quiz session")]
    NoActiveSession,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted by `LearningEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearningError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("reveal the answer before grading")]
    NotRevealed,
    #[error("no card to grade")]
    NoCurrentCard,
    #[error(transparent)]
    Api(#[from] ApiError),
}
