use thiserror::Error;

use crate::services::CollaboratorError;

/// Errors raised by review-session transitions.
///
/// None of these leave a partial state change behind: a rejected transition
/// returns the error and the caller keeps its previous session value.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Operation already in progress: {0}")]
    Busy(&'static str),

    #[error("Collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),
}
