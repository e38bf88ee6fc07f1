//! Authenticated API client.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::Result;
use crate::auth::{
    AccessToken, CredentialPair, CredentialStore, Credentials, MemoryStorage, Registration,
    RenewalToken, SessionEvent, SessionTeardown, TerminationReason, TokenStorage,
};
use crate::config::ClientConfig;
use crate::error::{AuthError, Error, ProtocolError};

use super::coordinator::{HttpRenewer, RefreshCoordinator, Renewer};
use super::detector::{ExcludedEndpoints, UnauthorizedDetector, Verdict};
use super::dispatcher::Dispatcher;
use super::endpoints::{LoginRequest, RegisterRequest, SessionResponse};
use super::request::ApiRequest;
use super::response::ApiResponse;
use super::retry::RetryExecutor;

/// An HTTP client that renews its access credential transparently.
///
/// A rejected access credential is renewed once per concurrency window, no
/// matter how many requests hit the rejection together; every affected
/// request is then replayed. If renewal is impossible the session is torn
/// down and every affected request fails with the same terminal error.
///
/// Cheap to clone (internal `Arc`); clones share credentials and the
/// single-flight state.
///
/// # Example
///
/// ```no_run
/// use tokenflight::{ApiUrl, AuthClient, ClientConfig, Credentials};
///
/// # async fn example() -> Result<(), tokenflight::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
/// let client = AuthClient::new(config).await?;
/// client.login(&Credentials::new("broker@example.com", "hunter2")).await?;
///
/// let policies = client.get("/policies").await?;
/// println!("{}", policies.text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: ClientConfig,
    store: CredentialStore,
    dispatcher: Dispatcher,
    detector: UnauthorizedDetector,
    coordinator: RefreshCoordinator,
    retry: RetryExecutor,
    teardown: SessionTeardown,
}

impl AuthClient {
    /// Create a client whose credentials live only in memory.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_storage(config, Arc::new(MemoryStorage::new())).await
    }

    /// Create a client seeded from, and writing through to, `storage`.
    pub async fn with_storage(config: ClientConfig, storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let store = CredentialStore::load(storage).await;
        Self::with_store(config, store)
    }

    /// Create a client around an existing store.
    pub fn with_store(config: ClientConfig, store: CredentialStore) -> Result<Self> {
        let dispatcher = Dispatcher::new(&config, store.clone())?;
        let renewer = Arc::new(HttpRenewer::new(
            dispatcher.clone(),
            config.refresh_path.clone(),
        ));
        Ok(Self::assemble(config, store, dispatcher, renewer))
    }

    /// Create a client with a custom renewal implementation.
    pub fn with_renewer(
        config: ClientConfig,
        store: CredentialStore,
        renewer: Arc<dyn Renewer>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::new(&config, store.clone())?;
        Ok(Self::assemble(config, store, dispatcher, renewer))
    }

    fn assemble(
        config: ClientConfig,
        store: CredentialStore,
        dispatcher: Dispatcher,
        renewer: Arc<dyn Renewer>,
    ) -> Self {
        let detector = UnauthorizedDetector::new(ExcludedEndpoints::from_config(&config));
        let teardown = SessionTeardown::new(store.clone());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            teardown.clone(),
            renewer,
            config.renewal_timeout(),
        );
        let retry = RetryExecutor::new(dispatcher.clone(), detector.clone());

        Self {
            inner: Arc::new(ClientInner {
                config,
                store,
                dispatcher,
                detector,
                coordinator,
                retry,
                teardown,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Subscribe to session established/terminated events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.teardown.subscribe()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.get().await.is_some()
    }

    /// Send a request, renewing the access credential and replaying the
    /// request once if it was rejected.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Renewal`] if the credential could not be renewed; the
    ///   session has been torn down, or was replaced while the renewal ran.
    /// - [`AuthError::AlreadyRetried`] if the replay was rejected too.
    /// - Transport errors as they occur. Non-2xx responses unrelated to
    ///   authorization are returned as responses.
    #[instrument(skip(self, request), fields(id = %request.id(), method = %request.method(), path = request.path()))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.inner.dispatcher.send(&request).await?;

        match self.inner.detector.classify(&request, &response) {
            Verdict::PassThrough => Ok(response),
            Verdict::AlreadyRetried => Err(AuthError::AlreadyRetried {
                status: response.status().as_u16(),
            }
            .into()),
            Verdict::Renew => {
                debug!(status = %response.status(), "Access credential rejected");
                let fresh = self
                    .inner
                    .coordinator
                    .renew(response.sent_with())
                    .await
                    .map_err(AuthError::from)?;
                self.inner.retry.retry(request, &fresh).await
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    /// Exchange credentials for a new session.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<CredentialPair> {
        info!("Logging in");
        let request = ApiRequest::post(&self.inner.config.login_path).json(&LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        })?;
        self.establish(request).await
    }

    /// Create an account, which also starts a session.
    #[instrument(skip(self, registration), fields(username = %registration.username()))]
    pub async fn register(&self, registration: &Registration) -> Result<CredentialPair> {
        info!("Registering account");
        let request =
            ApiRequest::post(&self.inner.config.register_path).json(&RegisterRequest {
                username: registration.username(),
                email: registration.email(),
                password: registration.password(),
            })?;
        self.establish(request).await
    }

    /// End the session. Returns false if there was none.
    pub async fn logout(&self) -> bool {
        self.inner
            .teardown
            .terminate(TerminationReason::LoggedOut)
            .await
    }

    /// Renew the access credential now, joining any renewal in flight.
    pub async fn refresh(&self) -> Result<CredentialPair> {
        Ok(self
            .inner
            .coordinator
            .renew_now()
            .await
            .map_err(AuthError::from)?)
    }

    async fn establish(&self, request: ApiRequest) -> Result<CredentialPair> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();

        if !response.is_success() {
            let error = response.to_protocol_error();
            if status == 400 || status == 401 || status == 403 {
                let reason = error
                    .message
                    .or(error.error)
                    .unwrap_or_else(|| format!("HTTP {}", status));
                return Err(AuthError::InvalidCredentials(reason).into());
            }
            return Err(Error::Protocol(error));
        }

        let body: SessionResponse = response.json()?;
        if body.access_token.is_empty() {
            return Err(ProtocolError::new(
                status,
                None,
                Some("empty access_token".to_string()),
            )
            .into());
        }

        let pair = CredentialPair::new(
            AccessToken::new(body.access_token),
            RenewalToken::new(body.refresh_token),
        );
        self.inner.store.set(pair.clone()).await;
        self.inner.teardown.established();
        debug!("Session established");
        Ok(pair)
    }
}
