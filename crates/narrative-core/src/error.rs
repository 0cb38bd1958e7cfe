//! Error types for the narrative service
//!
//! - [`RemoteError`]: a collaborator call failed
//! - [`NarrativeError`]: what public operations return
//! - [`ConfigError`]: configuration loading

use std::path::PathBuf;

/// Failure of a call to an external service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service answered with an error
    #[error("{service}.{method} failed: {message}")]
    Service {
        service: String,
        method: String,
        code: Option<i64>,
        message: String,
    },

    /// The service could not be reached
    #[error("transport error calling {service}: {message}")]
    Transport { service: String, message: String },

    /// The answer could not be decoded
    #[error("malformed response from {service}.{method}: {message}")]
    Decode {
        service: String,
        method: String,
        message: String,
    },
}

impl RemoteError {
    /// Service-side failure without an error code
    pub fn service(
        service: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            service: service.into(),
            method: method.into(),
            code: None,
            message: message.into(),
        }
    }
}

/// Main error type of public operations
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    /// Bad or ambiguous caller input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced spec, object or workspace does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A collaborator call failed; surfaced unchanged
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The introductory markdown could not be read
    #[error("cannot read intro markdown {path}: {source}")]
    IntroUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NarrativeError {
    /// Create invalid-argument error
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The collaborator failure behind this error, if any
    #[inline]
    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for public operations
pub type Result<T, E = NarrativeError> = std::result::Result<T, E>;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required URL or path is empty
    #[error("missing required config value: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_is_transparent() {
        let remote = RemoteError::service("Workspace", "clone_workspace", "quota exceeded");
        let err = NarrativeError::from(remote.clone());
        assert_eq!(err.to_string(), remote.to_string());
        assert_eq!(err.as_remote(), Some(&remote));
    }

    #[test]
    fn predicates() {
        assert!(NarrativeError::invalid("x").is_invalid_argument());
        assert!(NarrativeError::not_found("app spec", "a/b").is_not_found());
        assert!(NarrativeError::not_found("app spec", "a/b")
            .to_string()
            .contains("app spec not found: a/b"));
    }
}
