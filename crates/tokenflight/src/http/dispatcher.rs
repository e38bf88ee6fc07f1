//! Request dispatch with bearer credential attachment.

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tracing::{debug, instrument, trace};

use crate::Result;
use crate::auth::{AccessToken, CredentialStore};
use crate::config::ClientConfig;
use crate::error::InvalidInputError;
use crate::types::ApiUrl;

use super::request::ApiRequest;
use super::response::ApiResponse;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Sends requests, attaching the current access credential.
///
/// Holds no retry logic; that is layered on top by the client.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    base: ApiUrl,
    store: CredentialStore,
}

impl Dispatcher {
    pub fn new(config: &ClientConfig, store: CredentialStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base: config.base_url.clone(),
            store,
        })
    }

    /// Send with whatever access credential the store holds right now.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let credential = self.store.get().await.map(|pair| pair.access_token);
        self.send_with(request, credential.as_ref()).await
    }

    /// Send with an explicit access credential, or none.
    #[instrument(
        skip(self, request, credential),
        fields(id = %request.id(), method = %request.method(), path = request.path(), retried = request.is_retried())
    )]
    pub async fn send_with(
        &self,
        request: &ApiRequest,
        credential: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let url = self.base.endpoint_url(request.path());
        debug!(authenticated = credential.is_some(), "Dispatching request");

        let mut headers = request.headers().clone();
        headers.remove(AUTHORIZATION);
        if let Some(token) = credential {
            let value =
                HeaderValue::from_str(&token.bearer()).map_err(|e| InvalidInputError::Header {
                    name: AUTHORIZATION.to_string(),
                    reason: e.to_string(),
                })?;
            headers.insert(AUTHORIZATION, value);
        }
        let id = HeaderValue::from_str(&request.id().to_string()).map_err(|e| {
            InvalidInputError::Header {
                name: REQUEST_ID.to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(REQUEST_ID, id);

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(headers);
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        trace!(status = %status, bytes = body.len(), "Response received");

        Ok(ApiResponse::new(status, headers, body, credential.cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_creation() {
        let config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap());
        let dispatcher = Dispatcher::new(&config, CredentialStore::in_memory()).unwrap();
        assert_eq!(dispatcher.base.host(), Some("api.example.com"));
    }
}
