//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, connection: &ConnectionArgs) -> Result<()> {
    let session = CliSession::open(connection).await?;

    if session.client.logout().await {
        output::success("Logged out");
    } else {
        output::warning("No active session");
    }

    Ok(())
}
