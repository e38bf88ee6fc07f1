//! Register command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tokenflight::Registration;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Username for the new account
    #[arg(long)]
    pub username: String,

    /// Email address for the new account
    #[arg(long)]
    pub email: String,

    /// Password for the new account
    #[arg(long, env = "TOKENFLIGHT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: RegisterArgs, connection: &ConnectionArgs) -> Result<()> {
    let session = CliSession::open(connection).await?;
    let registration = Registration::new(&args.username, &args.email, &args.password);

    eprintln!("{}", "Creating account...".dimmed());

    session
        .client
        .register(&registration)
        .await
        .context("Failed to register")?;
    session
        .remember_config()
        .context("Failed to save config")?;

    output::success("Account created");
    println!();
    output::field("User", &args.username);
    output::field("Email", &args.email);
    output::field("API", session.config().base_url.as_str());

    Ok(())
}
