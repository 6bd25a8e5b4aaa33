//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod refresh;
pub mod request;
pub mod signup;
pub mod whoami;

use anyhow::Result;

use crate::cli::{Cli, Commands};

pub async fn handle(cli: Cli) -> Result<()> {
    let connection = cli.connection;
    match cli.command {
        Commands::Login(args) => login::run(args, &connection).await,
        Commands::Signup(args) => signup::run(args, &connection).await,
        Commands::Logout(args) => logout::run(args, &connection).await,
        Commands::Whoami(args) => whoami::run(args, &connection).await,
        Commands::Refresh(args) => refresh::run(args, &connection).await,
        Commands::Request(args) => request::run(args, &connection).await,
    }
}
