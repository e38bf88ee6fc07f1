//! Authorization middleware around the HTTP client.
//!
//! Requests flow dispatcher → detector → coordinator → retry executor; the
//! [`AuthClient`] wires them together.

mod client;
mod coordinator;
mod detector;
mod dispatcher;
mod endpoints;
mod request;
mod response;
mod retry;

pub use client::AuthClient;
pub use coordinator::{HttpRenewer, RefreshCoordinator, RenewalOutcome, Renewer};
pub use detector::{ExcludedEndpoints, UnauthorizedDetector, Verdict, is_authorization_failure};
pub use dispatcher::Dispatcher;
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use retry::RetryExecutor;
