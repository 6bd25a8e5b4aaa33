//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, connection: &ConnectionArgs) -> Result<()> {
    let client = session::require_session(connection)?;

    output::status("Renewing tokens...");

    // Name the current access token as stale so the exchange always runs.
    let current = client.store().get().map(|pair| pair.access_token);
    client
        .coordinator()
        .refresh(current.as_ref())
        .await
        .context("Failed to renew tokens")?;

    output::success("Tokens renewed");

    Ok(())
}
