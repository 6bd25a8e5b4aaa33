//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authwire_core::Credentials;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "AUTHWIRE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, connection: &ConnectionArgs) -> Result<()> {
    let client = session::open_client(connection)?;
    let credentials = Credentials::new(&args.email, &args.password);

    output::status("Signing in...");

    let user = client
        .sign_in(&credentials)
        .await
        .context("Failed to sign in")?;

    output::success("Signed in successfully");
    println!();
    output::field("ID", &user.id);
    output::field("Email", &user.email);
    output::field("API", client.config().api().as_str());

    Ok(())
}
