//! Status command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::{CliSession, storage};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the full credentials instead of a redacted form
    #[arg(long)]
    pub show_tokens: bool,
}

pub async fn run(args: StatusArgs, connection: &ConnectionArgs) -> Result<()> {
    let session = CliSession::open(connection).await?;
    let pair = session
        .client
        .store()
        .get()
        .await
        .context("No active session. Run 'tokenflight login' first.")?;

    let show = |token: &str| {
        if args.show_tokens {
            token.to_string()
        } else {
            output::redact(token)
        }
    };

    output::field("API", session.config().base_url.as_str());
    output::field("Access token", &show(pair.access_token.as_str()));
    match &pair.renewal_token {
        Some(token) => output::field("Renewal token", &show(token.as_str())),
        None => output::field("Renewal token", "none"),
    }

    let saved_at = storage::open_credentials()?
        .saved_at()
        .await
        .context("Failed to read credentials file")?;
    if let Some(saved_at) = saved_at {
        output::field("Saved", &saved_at.to_rfc3339());
    }

    Ok(())
}
