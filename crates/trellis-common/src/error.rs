//! Error types for Trellis
//!
//! Errors are structured with fields to aid debugging: validation errors
//! always carry the request name and, where known, the offending field path
//! so a failed compile names exactly what was wrong.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Trellis operations
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error for a TenantCluster request
    #[error("validation error for {name}: {message}")]
    Validation {
        /// Logical name of the request with invalid configuration
        name: String,
        /// Description of what's invalid, including the rejected value
        message: String,
        /// The invalid field path (e.g., "spec.exposure.vip")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a validation error without request context
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            name: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with request context
    pub fn validation_for(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            name: name.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with request context and field path
    pub fn validation_for_field(
        name: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            name: name.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// The field path attached to a validation error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
