use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use wiremock::MockServer;

/// Base URL of a mock server.
pub fn api_url(server: &MockServer) -> String {
    format!("http://127.0.0.1:{}", server.address().port())
}

/// Token file inside an isolated directory.
pub fn token_file(dir: &Path) -> PathBuf {
    dir.join("tokens.json")
}

/// Run the CLI binary against `api` with an isolated token file.
///
/// Runs on a blocking thread so the mock server keeps serving.
pub async fn run_cli(args: &[&str], dir: &Path, api: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_authwire"));
    cmd.args(args);
    cmd.arg("--api").arg(api);
    cmd.arg("--store").arg(token_file(dir));
    cmd.env("HOME", dir);
    cmd.env("XDG_DATA_HOME", dir.join("data"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("AUTHWIRE_API");
    cmd.env_remove("AUTHWIRE_STORE");
    cmd.env_remove("AUTHWIRE_PASSWORD");
    cmd.env_remove("RUST_LOG");

    tokio::task::spawn_blocking(move || cmd.output().expect("Failed to execute CLI"))
        .await
        .expect("CLI task panicked")
}

/// Run the CLI and expect success.
pub async fn run_cli_success(args: &[&str], dir: &Path, api: &str) -> String {
    let output = run_cli(args, dir, api).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure.
pub async fn run_cli_failure(args: &[&str], dir: &Path, api: &str) -> String {
    let output = run_cli(args, dir, api).await;
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
