//! Single-flight access credential renewal.
//!
//! The coordinator is either `Idle` or `Refreshing`. The first caller that
//! needs a renewal flips it to `Refreshing` under the state mutex and the
//! renewal call starts on a task owned by the coordinator; every later caller
//! joins the waiter queue instead of issuing a call of its own. When the call
//! finishes the new pair is stored (or the session torn down) before the
//! waiters are released, oldest first.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::auth::{
    AccessToken, CredentialPair, CredentialStore, RenewalToken, SessionTeardown,
    TerminationReason,
};
use crate::error::RenewalError;

use super::dispatcher::Dispatcher;
use super::endpoints::{RenewalRequest, RenewalResponse};
use super::request::ApiRequest;

/// Outcome every waiter on one renewal receives.
pub type RenewalOutcome = std::result::Result<CredentialPair, RenewalError>;

/// Performs the renewal network call.
#[async_trait]
pub trait Renewer: Send + Sync + fmt::Debug {
    /// Exchange `token` for a new pair derived from `current`.
    async fn renew(&self, current: &CredentialPair, token: &RenewalToken) -> RenewalOutcome;
}

/// Renews against the configured renewal endpoint.
#[derive(Debug, Clone)]
pub struct HttpRenewer {
    dispatcher: Dispatcher,
    refresh_path: String,
}

impl HttpRenewer {
    pub fn new(dispatcher: Dispatcher, refresh_path: impl Into<String>) -> Self {
        Self {
            dispatcher,
            refresh_path: refresh_path.into(),
        }
    }
}

#[async_trait]
impl Renewer for HttpRenewer {
    async fn renew(&self, current: &CredentialPair, token: &RenewalToken) -> RenewalOutcome {
        let request = ApiRequest::post(&self.refresh_path)
            .json(&RenewalRequest {
                token: token.as_str(),
            })
            .map_err(|e| RenewalError::Transport {
                message: e.to_string(),
            })?;

        // The renewal token in the body is the credential; the expired
        // access token is not sent.
        let response = self
            .dispatcher
            .send_with(&request, None)
            .await
            .map_err(|e| RenewalError::Transport {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            let error = response.to_protocol_error();
            return Err(RenewalError::Rejected {
                status: error.status,
                message: error.message.or(error.error),
            });
        }

        let body: RenewalResponse =
            response
                .json()
                .map_err(|e| RenewalError::MalformedResponse {
                    message: e.to_string(),
                })?;
        if body.access_token.is_empty() {
            return Err(RenewalError::MalformedResponse {
                message: "empty access_token".to_string(),
            });
        }

        Ok(current.renewed(
            AccessToken::new(body.access_token),
            body.refresh_token.map(RenewalToken::new),
        ))
    }
}

enum RefreshState {
    Idle,
    Refreshing {
        waiters: VecDeque<oneshot::Sender<RenewalOutcome>>,
    },
}

/// Guarantees at most one renewal call in flight.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    state: Mutex<RefreshState>,
    store: CredentialStore,
    teardown: SessionTeardown,
    renewer: Arc<dyn Renewer>,
    timeout: Duration,
    timeout_ms: u64,
    calls: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        store: CredentialStore,
        teardown: SessionTeardown,
        renewer: Arc<dyn Renewer>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(RefreshState::Idle),
                store,
                teardown,
                renewer,
                timeout,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain a fresh pair after a request carrying `stale` was rejected.
    ///
    /// If the store already holds a different access credential, a renewal
    /// finished after that request was dispatched and the current pair is
    /// returned without another call. Otherwise the caller starts or joins
    /// the in-flight renewal.
    pub async fn renew(&self, stale: Option<&AccessToken>) -> RenewalOutcome {
        let receiver = {
            let mut state = self.inner.state.lock().await;
            if let Some(stale) = stale
                && let Some(current) = self.inner.store.get().await
                && current.access_token != *stale
            {
                debug!("Access credential already renewed");
                return Ok(current);
            }
            self.register(&mut state)
        };
        receiver.await.unwrap_or(Err(RenewalError::Abandoned))
    }

    /// Renew regardless of which credential is current.
    pub async fn renew_now(&self) -> RenewalOutcome {
        let receiver = {
            let mut state = self.inner.state.lock().await;
            self.register(&mut state)
        };
        receiver.await.unwrap_or(Err(RenewalError::Abandoned))
    }

    /// Number of callers suspended on the in-flight renewal.
    pub async fn waiting(&self) -> usize {
        match &*self.inner.state.lock().await {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Number of renewal network calls issued so far.
    pub fn renewal_calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn register(&self, state: &mut RefreshState) -> oneshot::Receiver<RenewalOutcome> {
        let (sender, receiver) = oneshot::channel();

        if let RefreshState::Refreshing { waiters } = state {
            waiters.push_back(sender);
            debug!(waiters = waiters.len(), "Joined in-flight renewal");
            return receiver;
        }

        *state = RefreshState::Refreshing {
            waiters: VecDeque::from([sender]),
        };
        // Owned by the coordinator so the batch resolves even if the
        // caller that started it is dropped.
        tokio::spawn(self.clone().run());
        receiver
    }

    #[instrument(skip(self))]
    async fn run(self) {
        let (renewed_from, outcome) = self.attempt().await;
        let outcome = self.settle(renewed_from.as_ref(), outcome).await;

        let waiters = {
            let mut state = self.inner.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => VecDeque::new(),
            }
        };

        debug!(waiters = waiters.len(), "Releasing renewal waiters");
        for waiter in waiters {
            // A dropped receiver only means that caller went away.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Apply the outcome to the session it was computed from.
    ///
    /// A logout or login that landed while the call was in flight wins: the
    /// renewed pair is discarded and a failure does not end the newer session.
    async fn settle(
        &self,
        renewed_from: Option<&AccessToken>,
        outcome: RenewalOutcome,
    ) -> RenewalOutcome {
        match (outcome, renewed_from) {
            (Ok(pair), Some(previous)) => {
                if self.inner.store.replace_if(previous, pair.clone()).await {
                    info!("Access credential renewed");
                    Ok(pair)
                } else {
                    warn!("Session changed during renewal, discarding renewed credential");
                    Err(RenewalError::Superseded)
                }
            }
            (Ok(_), None) => Err(RenewalError::Superseded),
            (Err(e), Some(previous)) => {
                warn!(error = %e, "Renewal failed, ending session");
                self.inner
                    .teardown
                    .terminate_if(previous, TerminationReason::RenewalFailed)
                    .await;
                Err(e)
            }
            (Err(e), None) => {
                debug!(error = %e, "Renewal impossible without a session");
                Err(e)
            }
        }
    }

    /// Run the renewal call, returning the access credential it renews.
    async fn attempt(&self) -> (Option<AccessToken>, RenewalOutcome) {
        let Some(current) = self.inner.store.get().await else {
            return (None, Err(RenewalError::MissingRenewalCredential));
        };
        let previous = current.access_token.clone();
        let Some(token) = current.renewal_token.clone() else {
            return (Some(previous), Err(RenewalError::MissingRenewalCredential));
        };

        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        debug!(timeout_ms = self.inner.timeout_ms, "Calling renewal endpoint");

        let outcome = match tokio::time::timeout(
            self.inner.timeout,
            self.inner.renewer.renew(&current, &token),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(RenewalError::Timeout {
                duration_ms: self.inner.timeout_ms,
            }),
        };
        (Some(previous), outcome)
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("renewer", &self.inner.renewer)
            .field("timeout", &self.inner.timeout)
            .field("calls", &self.renewal_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionEvent;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Renewer that waits for a go signal, then answers with a fixed result.
    #[derive(Debug)]
    struct GatedRenewer {
        gate: Notify,
        delay: Option<Duration>,
        result: StdMutex<RenewalOutcome>,
    }

    impl GatedRenewer {
        fn succeeding(access: &str) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                delay: None,
                result: StdMutex::new(Ok(pair(access, "renew-2"))),
            })
        }

        fn failing(err: RenewalError) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                delay: None,
                result: StdMutex::new(Err(err)),
            })
        }

        fn stalled(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                delay: Some(delay),
                result: StdMutex::new(Ok(pair("never", "never"))),
            })
        }

        fn open(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl Renewer for GatedRenewer {
        async fn renew(&self, _current: &CredentialPair, _token: &RenewalToken) -> RenewalOutcome {
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => self.gate.notified().await,
            }
            self.result.lock().unwrap().clone()
        }
    }

    fn pair(access: &str, renewal: &str) -> CredentialPair {
        CredentialPair::new(AccessToken::new(access), RenewalToken::new(renewal))
    }

    async fn setup(
        initial: Option<CredentialPair>,
        renewer: Arc<dyn Renewer>,
    ) -> (CredentialStore, SessionTeardown, RefreshCoordinator) {
        let store = CredentialStore::in_memory();
        if let Some(initial) = initial {
            store.set(initial).await;
        }
        let teardown = SessionTeardown::new(store.clone());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            teardown.clone(),
            renewer,
            Duration::from_secs(10),
        );
        (store, teardown, coordinator)
    }

    async fn wait_for_waiters(coordinator: &RefreshCoordinator, n: usize) {
        while coordinator.waiting().await < n {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_call(coordinator: &RefreshCoordinator) {
        while coordinator.renewal_calls() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_call() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;
        let stale = AccessToken::new("access-1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            let stale = stale.clone();
            handles.push(tokio::spawn(async move {
                coordinator.renew(Some(&stale)).await
            }));
        }
        wait_for_waiters(&coordinator, 8).await;
        renewer.open();

        for handle in handles {
            let fresh = handle.await.unwrap().unwrap();
            assert_eq!(fresh.access_token.as_str(), "access-2");
        }
        assert_eq!(coordinator.renewal_calls(), 1);
        assert_eq!(store.get().await, Some(pair("access-2", "renew-2")));
        assert_eq!(coordinator.waiting().await, 0);
    }

    #[tokio::test]
    async fn test_waiters_released_in_registration_order() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (_store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;
        let order = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for id in 0..5 {
            let waiter = coordinator.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                waiter.renew_now().await.unwrap();
                order.lock().unwrap().push(id);
            }));
            // Register one at a time so registration order is known.
            wait_for_waiters(&coordinator, id + 1).await;
        }
        renewer.open();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_store_updated_before_waiters_released() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;

        let handle = {
            let coordinator = coordinator.clone();
            let store = store.clone();
            tokio::spawn(async move {
                let fresh = coordinator.renew_now().await.unwrap();
                (fresh, store.get().await)
            })
        };
        wait_for_waiters(&coordinator, 1).await;
        renewer.open();

        let (fresh, observed) = handle.await.unwrap();
        assert_eq!(observed, Some(fresh));
    }

    #[tokio::test]
    async fn test_failure_rejects_all_and_tears_down_once() {
        let renewer = GatedRenewer::failing(RenewalError::Rejected {
            status: 400,
            message: None,
        });
        let (store, teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;
        let mut events = teardown.subscribe();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.renew(Some(&AccessToken::new("access-1"))).await
            }));
        }
        wait_for_waiters(&coordinator, 4).await;
        renewer.open();

        for handle in handles {
            assert!(matches!(
                handle.await.unwrap(),
                Err(RenewalError::Rejected { status: 400, .. })
            ));
        }
        assert!(store.get().await.is_none());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Terminated {
                reason: TerminationReason::RenewalFailed
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_renewal_token_short_circuits() {
        let renewer = GatedRenewer::succeeding("unused");
        let (store, teardown, coordinator) = setup(
            Some(CredentialPair::access_only(AccessToken::new("access-1"))),
            renewer,
        )
        .await;
        let mut events = teardown.subscribe();

        let result = coordinator.renew(Some(&AccessToken::new("access-1"))).await;

        assert_eq!(result, Err(RenewalError::MissingRenewalCredential));
        assert_eq!(coordinator.renewal_calls(), 0);
        assert!(store.get().await.is_none());
        assert!(events.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits() {
        let (_store, _teardown, coordinator) =
            setup(None, GatedRenewer::succeeding("unused")).await;

        let result = coordinator.renew(None).await;

        assert_eq!(result, Err(RenewalError::MissingRenewalCredential));
        assert_eq!(coordinator.renewal_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_renewal_times_out() {
        let renewer = GatedRenewer::stalled(Duration::from_secs(60));
        let (store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer).await;

        let result = coordinator.renew(Some(&AccessToken::new("access-1"))).await;

        assert_eq!(result, Err(RenewalError::Timeout { duration_ms: 10_000 }));
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_caller_gets_current_pair_without_call() {
        let renewer = GatedRenewer::succeeding("unused");
        let (_store, _teardown, coordinator) =
            setup(Some(pair("access-2", "renew-2")), renewer).await;

        let fresh = coordinator
            .renew(Some(&AccessToken::new("access-1")))
            .await
            .unwrap();

        assert_eq!(fresh.access_token.as_str(), "access-2");
        assert_eq!(coordinator.renewal_calls(), 0);
    }

    #[tokio::test]
    async fn test_coordinator_returns_to_idle_for_next_window() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (_store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;

        for expected in 1..=2 {
            let handle = {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.renew_now().await })
            };
            wait_for_waiters(&coordinator, 1).await;
            renewer.open();
            handle.await.unwrap().unwrap();
            assert_eq!(coordinator.renewal_calls(), expected);
        }
    }

    #[tokio::test]
    async fn test_logout_during_renewal_stays_logged_out() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (store, teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;
        let mut events = teardown.subscribe();

        let handle = {
            let waiter = coordinator.clone();
            tokio::spawn(async move { waiter.renew(Some(&AccessToken::new("access-1"))).await })
        };
        wait_for_call(&coordinator).await;

        assert!(teardown.terminate(TerminationReason::LoggedOut).await);
        renewer.open();

        assert_eq!(handle.await.unwrap(), Err(RenewalError::Superseded));
        assert!(store.get().await.is_none());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Terminated {
                reason: TerminationReason::LoggedOut
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_login_during_failing_renewal_keeps_new_session() {
        let renewer = GatedRenewer::failing(RenewalError::Rejected {
            status: 400,
            message: None,
        });
        let (store, teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;
        let mut events = teardown.subscribe();

        let handle = {
            let waiter = coordinator.clone();
            tokio::spawn(async move { waiter.renew(Some(&AccessToken::new("access-1"))).await })
        };
        wait_for_call(&coordinator).await;

        store.set(pair("login-access", "login-renew")).await;
        renewer.open();

        assert!(matches!(
            handle.await.unwrap(),
            Err(RenewalError::Rejected { status: 400, .. })
        ));
        assert_eq!(store.get().await, Some(pair("login-access", "login-renew")));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_login_during_successful_renewal_keeps_new_session() {
        let renewer = GatedRenewer::succeeding("access-2");
        let (store, _teardown, coordinator) =
            setup(Some(pair("access-1", "renew-1")), renewer.clone()).await;

        let handle = {
            let waiter = coordinator.clone();
            tokio::spawn(async move { waiter.renew_now().await })
        };
        wait_for_call(&coordinator).await;

        store.set(pair("login-access", "login-renew")).await;
        renewer.open();

        assert_eq!(handle.await.unwrap(), Err(RenewalError::Superseded));
        assert_eq!(store.get().await, Some(pair("login-access", "login-renew")));
    }

    #[test]
    fn test_unbounded_timeout_reports_saturated_millis() {
        let store = CredentialStore::in_memory();
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            SessionTeardown::new(store),
            GatedRenewer::succeeding("unused"),
            Duration::MAX,
        );

        assert_eq!(coordinator.inner.timeout_ms, u64::MAX);
    }
}
