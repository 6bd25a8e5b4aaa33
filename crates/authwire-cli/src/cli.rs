//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use authwire_core::ApiUrl;

use crate::commands::{login, logout, refresh, request, signup, whoami};

/// Sign in to an API and make authenticated requests.
#[derive(Parser, Debug)]
#[command(name = "authwire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to talk to and where to keep tokens.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// API base URL
    #[arg(
        long,
        env = "AUTHWIRE_API",
        default_value = "http://localhost:3000",
        global = true
    )]
    pub api: ApiUrl,

    /// Token file (defaults to the platform data directory)
    #[arg(long, env = "AUTHWIRE_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login(login::LoginArgs),

    /// Create an account and sign in to it
    Signup(signup::SignupArgs),

    /// Sign out and forget the stored tokens
    Logout(logout::LogoutArgs),

    /// Display the signed-in user
    Whoami(whoami::WhoamiArgs),

    /// Renew the stored token pair now
    Refresh(refresh::RefreshArgs),

    /// Send an authenticated request
    Request(request::RequestArgs),
}
