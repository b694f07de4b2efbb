//! Error types surfaced by the index and query layers.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an index build.
///
/// Per-file problems never show up here; they are collected as
/// [`FailedFile`](crate::index::FailedFile) entries in the build stats.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("corpus directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("corpus directory unreadable: {}: {source}", path.display())]
    CorpusUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A malformed query string.
///
/// `position` is the byte offset of `token` in the original query text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at position {position} (near `{token}`)")]
pub struct QuerySyntaxError {
    pub token: String,
    pub position: usize,
    pub message: String,
}

impl QuerySyntaxError {
    pub fn new(token: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            position,
            message: message.into(),
        }
    }
}
