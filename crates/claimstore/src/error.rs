//! Domain error types for request-object persistence and claim retrieval.

/// Errors that can occur while persisting or retrieving request objects.
#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    /// An error occurred while storing or retrieving request-object data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An opaque access token could not be resolved to an internal token id.
    #[error("Token lookup failed: {message}")]
    TokenLookup {
        /// Description of the lookup failure.
        message: String,
    },

    /// Serialization of an introspection response failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OidcError {
    /// Create a `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a `TokenLookup` error.
    #[must_use]
    pub fn token_lookup(message: impl Into<String>) -> Self {
        Self::TokenLookup {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a storage error.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns `true` if this is a token lookup error.
    #[must_use]
    pub fn is_token_lookup(&self) -> bool {
        matches!(self, Self::TokenLookup { .. })
    }
}

/// Result type for domain operations.
pub type OidcResult<T> = Result<T, OidcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = OidcError::storage("connection refused");
        assert!(err.is_storage());
        assert!(!err.is_token_lookup());
        assert_eq!(err.to_string(), "Storage error: connection refused");
    }

    #[test]
    fn test_token_lookup_error_display() {
        let err = OidcError::token_lookup("unknown token");
        assert!(err.is_token_lookup());
        assert_eq!(err.to_string(), "Token lookup failed: unknown token");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = OidcError::from(json_err);
        assert!(matches!(err, OidcError::Serialization(_)));
    }
}
