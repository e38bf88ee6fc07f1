//! Credentials, their storage, and session teardown.
//!
//! Everything here is owned by an [`AuthClient`](crate::AuthClient); there is
//! no process-global state, so each client (and each test) is isolated.

mod credentials;
mod storage;
mod store;
mod teardown;
mod tokens;

pub use credentials::{Credentials, Registration};
pub use storage::{ACCESS_SLOT, FileStorage, MemoryStorage, RENEWAL_SLOT, TokenStorage};
pub use store::CredentialStore;
pub use teardown::{SessionEvent, SessionTeardown, TerminationReason};
pub use tokens::{AccessToken, CredentialPair, RenewalToken};
