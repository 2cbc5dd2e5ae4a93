use std::fmt;

use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key that caused the error (e.g., "max_item", "timeout_ms")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config", "executor")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for executor setup and lifecycle.
///
/// Faults raised by batch handlers never show up here: handlers run detached
/// and own their own failure handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Lifecycle error: {message}{}", format_context(.context))]
    Lifecycle {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new lifecycle error with structured context
    pub fn lifecycle_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Lifecycle {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Lifecycle { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

/// Returned by `submit` once the executor has begun shutting down.
///
/// Carries the rejected item back to the caller.
pub struct SubmitError<T>(pub T);

impl<T> SubmitError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "executor is no longer accepting items")
    }
}

impl<T> std::error::Error for SubmitError<T> {}

/// Returned by `try_submit` when the item could not be queued right away.
pub enum TrySubmitError<T> {
    /// The submission queue is at capacity.
    Full(T),
    /// The executor has begun shutting down.
    Closed(T),
}

impl<T> TrySubmitError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySubmitError::Full(item) | TrySubmitError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TrySubmitError::Full(_))
    }
}

impl<T> fmt::Debug for TrySubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySubmitError::Full(_) => f.write_str("Full(..)"),
            TrySubmitError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySubmitError::Full(_) => write!(f, "submission queue is full"),
            TrySubmitError::Closed(_) => write!(f, "executor is no longer accepting items"),
        }
    }
}

impl<T> std::error::Error for TrySubmitError<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = Error::configuration_with_context(
            "max_item must be positive",
            ErrorContext::new()
                .with_field_path("max_item")
                .with_source("config"),
        );
        let text = err.to_string();
        assert!(text.starts_with("Configuration error: max_item must be positive"));
        assert!(text.contains("field: max_item"));
        assert!(text.contains("source: config"));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("max_item")
        );
    }

    #[test]
    fn test_error_display_without_context() {
        let err = Error::lifecycle_with_context("already started", ErrorContext::default());
        assert_eq!(err.to_string(), "Lifecycle error: already started");
    }

    #[test]
    fn test_submit_errors_return_item() {
        assert_eq!(SubmitError(7).into_inner(), 7);
        let full = TrySubmitError::Full("a");
        assert!(full.is_full());
        assert_eq!(full.to_string(), "submission queue is full");
        assert_eq!(full.into_inner(), "a");
        let closed = TrySubmitError::Closed("b");
        assert!(!closed.is_full());
        assert_eq!(format!("{:?}", closed), "Closed(..)");
    }
}
