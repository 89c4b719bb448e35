//! # QueryError
//!
//! Failure kinds surfaced by the query engine. A blank search query and a
//! target without votes are not errors; they produce empty results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Storage was unreachable or rejected the query. Never retried here.
    #[error("retrieval failed: {0:#}")]
    Retrieval(#[source] anyhow::Error),

    /// The caller abandoned the request before it completed.
    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    pub fn retrieval(err: anyhow::Error) -> Self {
        QueryError::Retrieval(err)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }
}

/// Result of every engine operation.
pub type Result<T> = std::result::Result<T, QueryError>;
