//! Token types for bearer authentication.

use std::fmt;

/// An access token for authenticated API requests.
///
/// Access tokens are short-lived and attached to every outgoing request as a
/// bearer credential.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    ///
    /// # Security
    ///
    /// Use only when constructing HTTP authorization headers or persisting
    /// the session.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Hide token value in Debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A renewal token for obtaining new access tokens.
///
/// Renewal tokens are longer-lived and used solely against the renewal
/// endpoint.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct RenewalToken(String);

impl RenewalToken {
    /// Create a new renewal token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in renewal requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Hide token value in Debug output
impl fmt::Debug for RenewalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenewalToken").field(&"[REDACTED]").finish()
    }
}

/// The access credential together with the renewal credential that can
/// replace it.
///
/// Always read and written as a unit so a request never observes an access
/// token from one renewal paired with a renewal token from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: AccessToken,
    pub renewal_token: Option<RenewalToken>,
}

impl CredentialPair {
    /// Create a pair with both credentials.
    pub fn new(access_token: AccessToken, renewal_token: RenewalToken) -> Self {
        Self {
            access_token,
            renewal_token: Some(renewal_token),
        }
    }

    /// Create a pair that cannot be renewed.
    pub fn access_only(access_token: AccessToken) -> Self {
        Self {
            access_token,
            renewal_token: None,
        }
    }

    /// Build the pair that results from a renewal.
    ///
    /// A renewal response without a new renewal token keeps the old one.
    pub(crate) fn renewed(
        &self,
        access_token: AccessToken,
        renewal_token: Option<RenewalToken>,
    ) -> Self {
        Self {
            access_token,
            renewal_token: renewal_token.or_else(|| self.renewal_token.clone()),
        }
    }
}
