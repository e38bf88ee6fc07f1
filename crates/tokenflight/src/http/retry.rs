//! Replay of requests after a successful renewal.

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use crate::Result;
use crate::auth::CredentialPair;
use crate::error::AuthError;

use super::detector::{UnauthorizedDetector, Verdict};
use super::dispatcher::Dispatcher;
use super::request::ApiRequest;
use super::response::ApiResponse;

/// Re-dispatches a waiter's request with the renewed credential.
///
/// The replay is marked before it is sent, and its outcome goes straight
/// back to the caller: a second authorization failure is reported as
/// [`AuthError::AlreadyRetried`] and never reaches the coordinator.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    dispatcher: Dispatcher,
    detector: UnauthorizedDetector,
}

impl RetryExecutor {
    pub fn new(dispatcher: Dispatcher, detector: UnauthorizedDetector) -> Self {
        Self {
            dispatcher,
            detector,
        }
    }

    #[instrument(skip(self, waiter, fresh), fields(id = %waiter.id(), path = waiter.path()))]
    pub async fn retry(&self, mut waiter: ApiRequest, fresh: &CredentialPair) -> Result<ApiResponse> {
        if !waiter.mark_retried() {
            return Err(AuthError::AlreadyRetried {
                status: StatusCode::UNAUTHORIZED.as_u16(),
            }
            .into());
        }

        debug!("Replaying request with renewed credential");
        let response = self
            .dispatcher
            .send_with(&waiter, Some(&fresh.access_token))
            .await?;

        match self.detector.classify(&waiter, &response) {
            Verdict::AlreadyRetried => {
                warn!(status = %response.status(), "Replay rejected after renewal");
                Err(AuthError::AlreadyRetried {
                    status: response.status().as_u16(),
                }
                .into())
            }
            Verdict::PassThrough | Verdict::Renew => Ok(response),
        }
    }
}
