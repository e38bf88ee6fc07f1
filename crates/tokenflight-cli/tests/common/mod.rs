use std::path::Path;
use std::process::Output;

use tokio::process::Command;

/// Run the CLI with an isolated HOME so stored state never leaks between tests.
pub async fn run_cli(args: &[&str], home: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tokenflight"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env("TOKENFLIGHT_BASE_URL", base_url);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("TOKENFLIGHT_CONFIG");
    cmd.env_remove("TOKENFLIGHT_RENEWAL_TIMEOUT_MS");
    cmd.env_remove("TOKENFLIGHT_PASSWORD");
    cmd.output().await.expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub async fn run_cli_success(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli(args, home, base_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub async fn run_cli_failure(args: &[&str], home: &Path, base_url: &str) -> String {
    let output = run_cli(args, home, base_url).await;
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
