//! Completed response.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::auth::AccessToken;
use crate::error::{ProtocolError, TransportError};

use super::endpoints::ErrorBody;

/// A fully-read API response.
///
/// Non-2xx statuses are ordinary responses here; only transport failures
/// are errors.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    sent_with: Option<AccessToken>,
}

impl ApiResponse {
    pub(crate) fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
        sent_with: Option<AccessToken>,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            sent_with,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportError::Body {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// The access credential the request carried, if any.
    pub fn sent_with(&self) -> Option<&AccessToken> {
        self.sent_with.as_ref()
    }

    /// Parse the `{error, message}` body most APIs return on failure.
    pub(crate) fn error_body(&self) -> Option<ErrorBody> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Convert a failed response into a protocol error.
    pub fn to_protocol_error(&self) -> ProtocolError {
        match self.error_body() {
            Some(body) => ProtocolError::new(self.status.as_u16(), body.error, body.message),
            None => ProtocolError::new(self.status.as_u16(), None, None),
        }
    }
}
