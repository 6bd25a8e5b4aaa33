//! Signup command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authwire_core::Registration;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct SignupArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "AUTHWIRE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run(args: SignupArgs, connection: &ConnectionArgs) -> Result<()> {
    let client = session::open_client(connection)?;

    let mut registration = Registration::new(&args.email, &args.password);
    if let Some(name) = &args.name {
        registration = registration.with_name(name);
    }

    output::status("Creating account...");

    let user = client
        .sign_up(&registration)
        .await
        .context("Failed to create account")?;

    output::success("Account created");
    println!();
    output::field("ID", &user.id);
    output::field("Email", &user.email);
    if let Some(name) = &user.name {
        output::field("Name", name);
    }

    Ok(())
}
