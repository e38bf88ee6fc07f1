//! Subcommand implementations.

mod login;
mod logout;
mod refresh;
mod register;
mod request;
mod status;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::ConnectionArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session with a username and password
    Login(login::LoginArgs),

    /// Create an account and start a session
    Register(register::RegisterArgs),

    /// End the session and erase stored credentials
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Status(status::StatusArgs),

    /// Renew the access credential now
    Refresh(refresh::RefreshArgs),

    /// Send an authenticated request
    Request(request::RequestArgs),
}

pub async fn handle(cmd: Commands, connection: &ConnectionArgs) -> Result<()> {
    match cmd {
        Commands::Login(args) => login::run(args, connection).await,
        Commands::Register(args) => register::run(args, connection).await,
        Commands::Logout(args) => logout::run(args, connection).await,
        Commands::Status(args) => status::run(args, connection).await,
        Commands::Refresh(args) => refresh::run(args, connection).await,
        Commands::Request(args) => request::run(args, connection).await,
    }
}
