use std::backtrace::Backtrace;

use thiserror::Error;

/// Name of a single optimization pass, as understood by the rewrite engine.
/// Case-sensitive; unique within a resolved selection.
pub type OptimizationId = String;

/// Free-form `key=value` payload for one optimization pass.
///
/// Associated with the resolved selection by position, not by id. The engine
/// expects a list parallel to the selected passes.
pub type OptimizationConfig = String;

pub type RewriteResult<T> = Result<T, RewriteError>;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Wrong input: {description}")]
    BadInput { description: String },
    #[error("Rewrite deadline exceeded: {description}")]
    DeadlineExceeded { description: String },
    #[error("Rewrite engine failure: {error}")]
    EngineError { error: String },
    #[error("Service internal error: {error}")]
    ServiceError {
        error: String,
        backtrace: Option<String>,
    },
}

impl RewriteError {
    pub fn bad_input(description: impl Into<String>) -> RewriteError {
        RewriteError::BadInput {
            description: description.into(),
        }
    }

    pub fn deadline_exceeded(description: impl Into<String>) -> RewriteError {
        RewriteError::DeadlineExceeded {
            description: description.into(),
        }
    }

    pub fn engine_error(error: impl Into<String>) -> RewriteError {
        RewriteError::EngineError {
            error: error.into(),
        }
    }

    pub fn service_error(error: impl Into<String>) -> RewriteError {
        RewriteError::ServiceError {
            error: error.into(),
            backtrace: Some(Backtrace::force_capture().to_string()),
        }
    }

    /// The one error kind the invoker is allowed to downgrade.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, RewriteError::DeadlineExceeded { .. })
    }
}
