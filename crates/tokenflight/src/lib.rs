//! tokenflight - authenticated HTTP client with single-flight token renewal
//!
//! Every request goes through an [`AuthClient`], which attaches the current
//! access credential, notices when the server rejects it, renews it once for
//! however many requests were rejected together, and replays them. When the
//! renewal itself fails the session is torn down and subscribers are told.
//!
//! # Example
//!
//! ```no_run
//! use tokenflight::{ApiUrl, AuthClient, ClientConfig, SessionEvent};
//!
//! # async fn example() -> Result<(), tokenflight::Error> {
//! let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
//! let client = AuthClient::new(config).await?;
//!
//! let mut events = client.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::Terminated { reason } = event {
//!             eprintln!("signed out: {:?}", reason);
//!         }
//!     }
//! });
//!
//! let carriers = client.get("/carriers").await?;
//! println!("{}", carriers.status());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export primary types at crate root for convenience
pub use auth::{
    AccessToken, CredentialPair, CredentialStore, Credentials, FileStorage, MemoryStorage,
    Registration, RenewalToken, SessionEvent, TerminationReason, TokenStorage,
};
pub use config::ClientConfig;
pub use error::{AuthError, Error, RenewalError};
pub use http::{ApiRequest, ApiResponse, AuthClient};
pub use reqwest::{Method, StatusCode};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
