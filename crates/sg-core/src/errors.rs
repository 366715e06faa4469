//! Structured error types shared across the generator crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SgError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (sizes, counts, offending values).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for game generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SgError {
    /// Rejected configuration; raised before any random draw.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// An iteration cap was exhausted before the search stabilised.
    #[error("convergence error: {0}")]
    Convergence(ErrorInfo),
    /// An internal invariant did not hold.
    #[error("invariant error: {0}")]
    Invariant(ErrorInfo),
    /// Information-value analysis could not be carried out.
    #[error("analysis error: {0}")]
    Analysis(ErrorInfo),
    /// Serialization, parsing and IO errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SgError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SgError::Config(info)
            | SgError::Convergence(info)
            | SgError::Invariant(info)
            | SgError::Analysis(info)
            | SgError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error with a single context entry.
    pub fn config(code: &str, message: &str, key: &str, value: impl ToString) -> Self {
        SgError::Config(ErrorInfo::new(code, message).with_context(key, value))
    }

    /// Returns `true` for configuration rejections.
    pub fn is_config(&self) -> bool {
        matches!(self, SgError::Config(_))
    }

    /// Returns `true` when a search ran out of iterations.
    pub fn is_convergence(&self) -> bool {
        matches!(self, SgError::Convergence(_))
    }
}
