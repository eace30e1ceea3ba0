//! Token introspection response assembly (RFC 7662).
//!
//! Construction is two-phase: callers collect every raw token attribute
//! into a [`TokenMetadata`] first, then [`IntrospectionResponse::from_metadata`]
//! applies the inclusion rules as one pure transformation. The result is
//! order-independent; in particular the suppression of `exp` and `nbf` for
//! inactive tokens holds no matter when `active` was recorded.
//!
//! Inclusion rules:
//!
//! - `active` is always present
//! - `iat` is present only when non-zero
//! - `exp` and `nbf` are present only when the token is active and the
//!   value is non-zero
//! - string fields are present only when non-blank after trimming
//! - `error` and `error_description` are present verbatim whenever
//!   supplied, including blank strings

use serde::{Deserialize, Serialize};

use crate::error::OidcResult;

// =============================================================================
// Input
// =============================================================================

/// Raw token attributes collected before assembly.
///
/// Epoch fields use `0` to mean "not available", matching the token store's
/// convention. String fields left `None` or blank are omitted from the
/// response; the two error fields are included exactly as supplied.
#[derive(Debug, Clone, Default)]
pub struct TokenMetadata {
    /// Whether the token is currently active.
    pub active: bool,

    /// Issued-at time (Unix timestamp, 0 = absent).
    pub issued_at: i64,

    /// Expiration time (Unix timestamp, 0 = absent).
    pub expiration: i64,

    /// Not-before time (Unix timestamp, 0 = absent).
    pub not_before: i64,

    /// JWT ID.
    pub jwt_id: Option<String>,

    /// Subject identifier.
    pub subject: Option<String>,

    /// Resource owner username.
    pub username: Option<String>,

    /// Token type (e.g. "Bearer").
    pub token_type: Option<String>,

    /// Intended audience.
    pub audience: Option<String>,

    /// Token issuer.
    pub issuer: Option<String>,

    /// Space-separated granted scopes.
    pub scope: Option<String>,

    /// Client identifier (consumer key).
    pub client_id: Option<String>,

    /// Error code, recorded verbatim when present.
    pub error: Option<String>,

    /// Error description, recorded verbatim when present.
    pub error_description: Option<String>,
}

// =============================================================================
// Response
// =============================================================================

/// Token introspection response per RFC 7662.
///
/// Serializes to a flat JSON object whose only guaranteed key is `active`;
/// every other field is skipped when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Boolean indicator of whether the token is currently active.
    pub active: bool,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time (Unix timestamp). Suppressed for inactive tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not before time (Unix timestamp). Suppressed for inactive tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// JWT ID (unique identifier for the token).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Subject identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Human-readable identifier for the resource owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Type of the token (e.g., "Bearer").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Intended audience for this token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issuer of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// A space-separated list of scope values granted to the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client identifier for the OAuth 2.0 client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Error code, present verbatim when one was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error description, present verbatim when one was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl IntrospectionResponse {
    /// Apply the inclusion rules to raw token metadata.
    ///
    /// This is the only way fields enter the response, so the
    /// inactive-token suppression of `exp` and `nbf` cannot be bypassed by
    /// call ordering.
    #[must_use]
    pub fn from_metadata(meta: &TokenMetadata) -> Self {
        Self {
            active: meta.active,
            iat: epoch_field(meta.issued_at),
            exp: meta.active.then(|| epoch_field(meta.expiration)).flatten(),
            nbf: meta.active.then(|| epoch_field(meta.not_before)).flatten(),
            jti: non_blank(meta.jwt_id.as_deref()),
            sub: non_blank(meta.subject.as_deref()),
            username: non_blank(meta.username.as_deref()),
            token_type: non_blank(meta.token_type.as_deref()),
            aud: non_blank(meta.audience.as_deref()),
            iss: non_blank(meta.issuer.as_deref()),
            scope: non_blank(meta.scope.as_deref()),
            client_id: non_blank(meta.client_id.as_deref()),
            error: meta.error.clone(),
            error_description: meta.error_description.clone(),
        }
    }

    /// Serialize to the flat JSON wire object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> OidcResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&TokenMetadata> for IntrospectionResponse {
    fn from(meta: &TokenMetadata) -> Self {
        Self::from_metadata(meta)
    }
}

/// Zero epoch values mean "not available" and are omitted.
fn epoch_field(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

/// Blank and whitespace-only strings are omitted.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(ToString::to_string)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_response_is_bare() {
        let response = IntrospectionResponse::from_metadata(&TokenMetadata::default());
        assert!(!response.active);
        let json = response.to_json().unwrap();
        assert_eq!(json, r#"{"active":false}"#);
    }

    #[test]
    fn test_inactive_token_suppresses_exp_and_nbf() {
        let meta = TokenMetadata {
            active: false,
            expiration: 1_700_000_000,
            not_before: 1_699_990_000,
            issued_at: 1_699_996_400,
            ..Default::default()
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        assert_eq!(response.exp, None);
        assert_eq!(response.nbf, None);
        // iat is not gated on the active flag.
        assert_eq!(response.iat, Some(1_699_996_400));
    }

    #[test]
    fn test_active_token_includes_exp_and_nbf() {
        let meta = TokenMetadata {
            active: true,
            expiration: 1_700_000_000,
            not_before: 1_699_990_000,
            ..Default::default()
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        assert_eq!(response.exp, Some(1_700_000_000));
        assert_eq!(response.nbf, Some(1_699_990_000));
    }

    #[test]
    fn test_zero_epoch_fields_are_omitted() {
        let meta = TokenMetadata {
            active: true,
            ..Default::default()
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        assert_eq!(response.iat, None);
        assert_eq!(response.exp, None);
        assert_eq!(response.nbf, None);
    }

    #[test]
    fn test_blank_strings_are_omitted() {
        let meta = TokenMetadata {
            active: true,
            subject: Some("alice".to_string()),
            client_id: Some(String::new()),
            username: Some("   ".to_string()),
            scope: None,
            ..Default::default()
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        assert_eq!(response.sub, Some("alice".to_string()));
        assert_eq!(response.client_id, None);
        assert_eq!(response.username, None);
        assert_eq!(response.scope, None);
    }

    #[test]
    fn test_error_fields_are_verbatim_including_blank() {
        let meta = TokenMetadata {
            error: Some(String::new()),
            error_description: Some("token validation failed".to_string()),
            ..Default::default()
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        assert_eq!(response.error, Some(String::new()));
        assert_eq!(
            response.error_description,
            Some("token validation failed".to_string())
        );
        let json = response.to_json().unwrap();
        assert!(json.contains(r#""error":"""#));
        assert!(json.contains(r#""error_description":"token validation failed""#));
    }

    #[test]
    fn test_end_to_end_wire_format() {
        let meta = TokenMetadata {
            active: true,
            expiration: 1_999_999_999,
            subject: Some("alice".to_string()),
            client_id: Some(String::new()),
            ..Default::default()
        };
        let json = IntrospectionResponse::from_metadata(&meta).to_json().unwrap();
        assert!(json.contains(r#""active":true"#));
        assert!(json.contains(r#""exp":1999999999"#));
        assert!(json.contains(r#""sub":"alice""#));
        assert!(!json.contains("client_id"));
    }

    #[test]
    fn test_full_response_serialization() {
        let meta = TokenMetadata {
            active: true,
            issued_at: 1_699_996_400,
            expiration: 1_700_000_000,
            not_before: 1_699_990_000,
            jwt_id: Some("jti-1".to_string()),
            subject: Some("user123".to_string()),
            username: Some("john.doe".to_string()),
            token_type: Some("Bearer".to_string()),
            audience: Some("https://rs.example.com".to_string()),
            issuer: Some("https://auth.example.com".to_string()),
            scope: Some("openid email".to_string()),
            client_id: Some("test-client".to_string()),
            error: None,
            error_description: None,
        };
        let response = IntrospectionResponse::from_metadata(&meta);
        let json = response.to_json().unwrap();
        for key in [
            "active",
            "iat",
            "exp",
            "nbf",
            "jti",
            "sub",
            "username",
            "token_type",
            "aud",
            "iss",
            "scope",
            "client_id",
        ] {
            assert!(json.contains(&format!("\"{key}\":")), "missing key {key}");
        }
        assert!(!json.contains("error"));

        // Round-trips through the derived Deserialize.
        let parsed: IntrospectionResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
    }
}
