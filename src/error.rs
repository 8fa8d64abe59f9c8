// src/error.rs
use std::fmt;

use uuid::Uuid;

/// Broad category of a [`TokenError`], for callers that only branch on the
/// kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Validation,
    NotFound,
    Duplicate,
    InvariantViolation,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The identity did not authorize the call.
    Unauthorized(Uuid),
    Validation(String),
    NotFound(String),
    Duplicate(String),
    /// Supply above max, balance below zero or an amount out of range.
    InvariantViolation(String),
    Storage(String),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(id) => write!(f, "Missing required authority of {}", id),
            Self::Validation(msg) => write!(f, "Validation failed: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            Self::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}
