//! Requested claim model.
//!
//! A request object carries one or more groups of requested claims. Each
//! claim names an identity attribute, may be marked essential, and is
//! destined for either the ID token or the user-info endpoint.

use serde::{Deserialize, Serialize};

/// The response surface a claim was requested for.
///
/// The OIDC `claims` request parameter groups claims under `userinfo` and
/// `id_token` members. Claims under any other member have no surface and are
/// stored without a discriminator, making them invisible to surface-filtered
/// retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSurface {
    /// Claim requested for the user-info endpoint response.
    UserInfo,
    /// Claim requested for the ID token.
    IdToken,
}

impl ClaimSurface {
    /// Map a request-object claim member name to a surface.
    ///
    /// Returns `None` for unrecognized member names; such claims are still
    /// persisted but excluded from both retrieval filters.
    #[must_use]
    pub fn from_request_type(request_type: &str) -> Option<Self> {
        match request_type {
            "userinfo" => Some(Self::UserInfo),
            "id_token" => Some(Self::IdToken),
            _ => None,
        }
    }

    /// Whether this surface is the user-info endpoint.
    #[must_use]
    pub fn is_user_info(self) -> bool {
        matches!(self, Self::UserInfo)
    }
}

/// A single requested identity claim, parsed out of a request object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedClaim {
    /// Claim name, e.g. `email`.
    pub name: String,

    /// Whether the client marked the claim essential.
    #[serde(default)]
    pub essential: bool,

    /// Single expected value, if the client requested one.
    #[serde(default)]
    pub value: Option<String>,

    /// Enumerated set of acceptable values, if the client requested one.
    /// Empty for claims with no value constraint or a single `value`.
    #[serde(default)]
    pub values: Vec<String>,

    /// Surface the claim was requested for. `None` for claims requested
    /// under an unrecognized member of the `claims` parameter.
    #[serde(default)]
    pub surface: Option<ClaimSurface>,
}

impl RequestedClaim {
    /// Create a claim with no value constraint.
    #[must_use]
    pub fn new(name: impl Into<String>, essential: bool, surface: Option<ClaimSurface>) -> Self {
        Self {
            name: name.into(),
            essential,
            value: None,
            values: Vec::new(),
            surface,
        }
    }

    /// Attach a single expected value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attach an enumerated set of acceptable values.
    #[must_use]
    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_from_request_type() {
        assert_eq!(
            ClaimSurface::from_request_type("userinfo"),
            Some(ClaimSurface::UserInfo)
        );
        assert_eq!(
            ClaimSurface::from_request_type("id_token"),
            Some(ClaimSurface::IdToken)
        );
        assert_eq!(ClaimSurface::from_request_type("access_token"), None);
        assert_eq!(ClaimSurface::from_request_type(""), None);
    }

    #[test]
    fn test_surface_is_user_info() {
        assert!(ClaimSurface::UserInfo.is_user_info());
        assert!(!ClaimSurface::IdToken.is_user_info());
    }

    #[test]
    fn test_requested_claim_builders() {
        let claim = RequestedClaim::new("acr", true, Some(ClaimSurface::IdToken))
            .with_values(vec!["urn:mace:silver".to_string(), "urn:mace:bronze".to_string()]);
        assert_eq!(claim.name, "acr");
        assert!(claim.essential);
        assert!(claim.value.is_none());
        assert_eq!(claim.values.len(), 2);

        let claim = RequestedClaim::new("email", false, Some(ClaimSurface::UserInfo))
            .with_value("alice@example.com");
        assert_eq!(claim.value.as_deref(), Some("alice@example.com"));
        assert!(claim.values.is_empty());
    }
}
