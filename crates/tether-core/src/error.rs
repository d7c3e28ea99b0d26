//! Error types for the connector engine.

use crate::bindings::BindingId;
use crate::shapes::{PageId, ShapeId};
use thiserror::Error;

/// Errors surfaced by editor and engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Shape not found: {0}")]
    ShapeNotFound(ShapeId),
    #[error("Binding not found: {0}")]
    BindingNotFound(BindingId),
    #[error("Page not found: {0}")]
    PageNotFound(PageId),
    #[error("Shape {0} cannot be placed under the requested parent")]
    InvalidParent(ShapeId),
    #[error("History mark not found: {0}")]
    MarkNotFound(String),
    #[error("No handler registered for type: {0}")]
    UnknownType(String),
    #[error("Invariant violated: {0}")]
    Invariant(String),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Report a broken engine invariant.
///
/// Panics in debug builds. Release builds log the violation and hand back an
/// error so the caller drops the update.
pub fn invariant(message: impl Into<String>) -> EngineError {
    let message = message.into();
    log::error!("invariant violated: {message}");
    debug_assert!(false, "invariant violated: {message}");
    EngineError::Invariant(message)
}
