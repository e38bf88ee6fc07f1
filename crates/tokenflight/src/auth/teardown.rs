//! Session teardown and the session event signal.

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::store::CredentialStore;
use super::tokens::AccessToken;

const EVENT_CAPACITY: usize = 16;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The access credential could not be renewed.
    RenewalFailed,
    /// The user signed out.
    LoggedOut,
}

/// Session lifecycle notifications for the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login or registration stored a new credential pair.
    Established,
    /// The credential pair was discarded; authenticated views should close.
    Terminated { reason: TerminationReason },
}

/// Clears the credential store and tells subscribers the session is over.
#[derive(Debug, Clone)]
pub struct SessionTeardown {
    store: CredentialStore,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionTeardown {
    pub fn new(store: CredentialStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { store, events }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// End the session.
    ///
    /// Idempotent: only the call that actually removed a credential pair
    /// emits [`SessionEvent::Terminated`]. Returns whether this call did.
    pub async fn terminate(&self, reason: TerminationReason) -> bool {
        let taken = self.store.take().await.is_some();
        self.finish(reason, taken)
    }

    /// End the session only if it is still the one holding `expected`.
    ///
    /// A session started after `expected` was issued is left alone.
    pub async fn terminate_if(&self, expected: &AccessToken, reason: TerminationReason) -> bool {
        let taken = self.store.take_if(expected).await.is_some();
        self.finish(reason, taken)
    }

    fn finish(&self, reason: TerminationReason, taken: bool) -> bool {
        if !taken {
            debug!(?reason, "Session already torn down or replaced");
            return false;
        }

        info!(?reason, "Session terminated");
        // No subscribers is fine; the host may not listen.
        let _ = self.events.send(SessionEvent::Terminated { reason });
        true
    }

    pub(crate) fn established(&self) {
        let _ = self.events.send(SessionEvent::Established);
    }
}
