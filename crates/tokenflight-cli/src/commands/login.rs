//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tokenflight::Credentials;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username or email
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "TOKENFLIGHT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, connection: &ConnectionArgs) -> Result<()> {
    let session = CliSession::open(connection).await?;
    let credentials = Credentials::new(&args.username, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    session
        .client
        .login(&credentials)
        .await
        .context("Failed to login")?;
    session
        .remember_config()
        .context("Failed to save config")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", &args.username);
    output::field("API", session.config().base_url.as_str());

    Ok(())
}
