//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, connection: &ConnectionArgs) -> Result<()> {
    let client = session::open_client(connection)?;

    if !client.session().is_authenticated() {
        output::success("Already signed out");
        return Ok(());
    }

    client.sign_out().await;
    output::success("Signed out");

    Ok(())
}
