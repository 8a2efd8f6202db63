//! Error types for DeepTree

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("{what} already registered: {name}")]
    DuplicateName { what: &'static str, name: String },

    #[error("unsupported agent type: {0}")]
    UnsupportedAgentType(String),

    #[error("task targets agent {expected} but was submitted to {actual}")]
    AgentMismatch { expected: String, actual: String },

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("parameter {key}: expected {expected}, found {found}")]
    ParameterType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("handler error: {name} - {message}")]
    Handler { name: String, message: String },

    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Copyable classification of an [`Error`], carried inside task results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateName,
    UnsupportedAgentType,
    AgentMismatch,
    Timeout,
    Cancelled,
    PathNotFound,
    MissingParameter,
    ParameterType,
    InvalidParameter,
    InvalidState,
    Handler,
    CapabilityUnavailable,
    Config,
    Io,
    Json,
    Internal,
}

impl Error {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn duplicate(what: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            what,
            name: name.into(),
        }
    }

    pub fn handler(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::UnsupportedAgentType(_) => ErrorKind::UnsupportedAgentType,
            Self::AgentMismatch { .. } => ErrorKind::AgentMismatch,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::PathNotFound(_) => ErrorKind::PathNotFound,
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::ParameterType { .. } => ErrorKind::ParameterType,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
