//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, connection: &ConnectionArgs) -> Result<()> {
    let session = CliSession::open(connection).await?;

    if !session.client.is_authenticated().await {
        anyhow::bail!("No active session. Run 'tokenflight login' first.");
    }

    let pair = session
        .client
        .refresh()
        .await
        .context("Failed to renew access token")?;

    output::success("Access token renewed");
    output::field("Access token", &output::redact(pair.access_token.as_str()));

    Ok(())
}
