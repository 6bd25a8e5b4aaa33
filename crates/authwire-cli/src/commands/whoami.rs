//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the full profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, connection: &ConnectionArgs) -> Result<()> {
    let client = session::require_session(connection)?;

    let profile = client
        .session()
        .fetch_profile()
        .await
        .context("Failed to fetch profile")?;

    if args.json {
        return output::json_pretty(&profile);
    }

    output::field("ID", &profile.id);
    output::field("Email", &profile.email);
    if let Some(name) = &profile.name {
        output::field("Name", name);
    }
    output::field("API", client.config().api().as_str());

    Ok(())
}
