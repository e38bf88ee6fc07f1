//! Unauthorized response detection.

use std::collections::HashSet;

use reqwest::StatusCode;

use crate::config::ClientConfig;
use crate::types::normalize_path;

use super::request::ApiRequest;
use super::response::ApiResponse;

/// Body error codes treated as an expired or invalid access credential.
const AUTH_ERROR_CODES: &[&str] = &["invalid_token", "token_expired", "ExpiredToken", "InvalidToken"];

/// What to do with a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the response to the caller as-is.
    PassThrough,
    /// Renew the access credential and replay the request.
    Renew,
    /// The replay was rejected too; surface the failure.
    AlreadyRetried,
}

/// Paths that never trigger a renewal.
///
/// Holds the credential issuance and renewal endpoints, so a failed login
/// surfaces as a login error and a failed renewal cannot recurse.
#[derive(Debug, Clone, Default)]
pub struct ExcludedEndpoints {
    paths: HashSet<String>,
}

impl ExcludedEndpoints {
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut excluded = Self::default();
        excluded.insert(&config.login_path);
        excluded.insert(&config.register_path);
        excluded.insert(&config.refresh_path);
        for path in &config.extra_excluded_paths {
            excluded.insert(path);
        }
        excluded
    }

    pub fn insert(&mut self, path: &str) {
        self.paths.insert(normalize_path(path));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize_path(path))
    }
}

/// Classifies responses that should start a credential renewal.
#[derive(Debug, Clone)]
pub struct UnauthorizedDetector {
    excluded: ExcludedEndpoints,
}

impl UnauthorizedDetector {
    pub fn new(excluded: ExcludedEndpoints) -> Self {
        Self { excluded }
    }

    /// Classify a response once; the verdict drives the rest of the flow.
    pub fn classify(&self, request: &ApiRequest, response: &ApiResponse) -> Verdict {
        if !is_authorization_failure(response) || self.excluded.contains(request.path()) {
            Verdict::PassThrough
        } else if request.is_retried() {
            Verdict::AlreadyRetried
        } else {
            Verdict::Renew
        }
    }

    pub fn should_trigger_renewal(&self, request: &ApiRequest, response: &ApiResponse) -> bool {
        self.classify(request, response) == Verdict::Renew
    }
}

/// HTTP 401, or an error body naming an expired/invalid token.
pub fn is_authorization_failure(response: &ApiResponse) -> bool {
    if response.status() == StatusCode::UNAUTHORIZED {
        return true;
    }
    if response.is_success() {
        return false;
    }
    response
        .error_body()
        .and_then(|body| body.error)
        .is_some_and(|code| AUTH_ERROR_CODES.contains(&code.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiUrl;
    use reqwest::header::HeaderMap;

    fn detector() -> UnauthorizedDetector {
        let config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap());
        UnauthorizedDetector::new(ExcludedEndpoints::from_config(&config))
    }

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body.as_bytes().to_vec(),
            None,
        )
    }

    #[test]
    fn unauthorized_triggers_renewal() {
        let request = ApiRequest::get("/policies");
        assert_eq!(
            detector().classify(&request, &response(401, "")),
            Verdict::Renew
        );
    }

    #[test]
    fn logical_token_error_triggers_renewal() {
        let request = ApiRequest::get("/policies");
        let r = response(403, r#"{"error": "token_expired"}"#);
        assert!(detector().should_trigger_renewal(&request, &r));
    }

    #[test]
    fn unrelated_errors_pass_through() {
        let d = detector();
        let request = ApiRequest::get("/policies");
        assert_eq!(d.classify(&request, &response(200, "")), Verdict::PassThrough);
        assert_eq!(d.classify(&request, &response(403, r#"{"error": "forbidden"}"#)), Verdict::PassThrough);
        assert_eq!(d.classify(&request, &response(500, "")), Verdict::PassThrough);
        assert_eq!(d.classify(&request, &response(422, "not json")), Verdict::PassThrough);
    }

    #[test]
    fn excluded_endpoints_never_trigger() {
        let d = detector();
        for path in ["/auth/login", "auth/refresh/", "/auth/register"] {
            let request = ApiRequest::post(path);
            assert_eq!(d.classify(&request, &response(401, "")), Verdict::PassThrough);
        }
    }

    #[test]
    fn retried_request_is_already_retried() {
        let mut request = ApiRequest::get("/policies");
        request.mark_retried();
        assert_eq!(
            detector().classify(&request, &response(401, "")),
            Verdict::AlreadyRetried
        );
        assert!(!detector().should_trigger_renewal(&request, &response(401, "")));
    }

    #[test]
    fn extra_excluded_paths_from_config() {
        let config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap())
            .with_excluded_path("/auth/otp");
        let excluded = ExcludedEndpoints::from_config(&config);
        assert!(excluded.contains("/auth/otp/"));
        assert!(!excluded.contains("/policies"));
    }
}
