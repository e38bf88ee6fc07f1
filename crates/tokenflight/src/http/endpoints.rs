//! Session endpoint request/response types.

use serde::{Deserialize, Serialize};

/// Request body for login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for registration.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Response from login and registration.
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Request body for renewal.
#[derive(Debug, Serialize)]
pub struct RenewalRequest<'a> {
    pub token: &'a str,
}

/// Response from renewal.
///
/// A missing `refresh_token` means the current renewal token stays valid.
#[derive(Debug, Deserialize)]
pub struct RenewalResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body format.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
}
