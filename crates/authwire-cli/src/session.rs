//! Client construction and token file location.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;

use authwire_file::FilePersistence;
use authwire_http::{Client, ClientConfig};

use crate::cli::ConnectionArgs;

/// Resolve the token file path.
fn store_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }

    let dirs =
        ProjectDirs::from("", "", "authwire").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("tokens.json"))
}

/// Build a client whose tokens live in the CLI's token file.
pub fn open_client(args: &ConnectionArgs) -> Result<Client> {
    let path = store_path(args.store.as_ref())?;
    tracing::debug!(path = %path.display(), "Using token file");

    let config =
        ClientConfig::new(args.api.clone()).with_timeout(Duration::from_secs(args.timeout));
    let client = Client::new(config, FilePersistence::new(&path))
        .context("Failed to create HTTP client")?;
    Ok(client)
}

/// Build a client and require a stored session.
pub fn require_session(args: &ConnectionArgs) -> Result<Client> {
    let client = open_client(args)?;
    if !client.session().is_authenticated() {
        bail!("Not signed in. Run `authwire login` first.");
    }
    Ok(client)
}
