use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn run_qavid_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_qavid"))
        .args(args)
        .current_dir(env.path())
        .env("XDG_CONFIG_HOME", env.path().join("xdg"))
        .env("NO_COLOR", "1")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Render with the environment's config file and output directory.
pub fn run_render(env: &TestEnvironment, csv: &Path, extra: &[&str]) -> Result<CommandOutput> {
    let config = env.config_path();
    let csv = csv.to_string_lossy().to_string();
    let config = config.to_string_lossy().to_string();
    let mut args = vec![
        "--no-color",
        "render",
        "--csv",
        csv.as_str(),
        "--config",
        config.as_str(),
    ];
    args.extend_from_slice(extra);
    run_qavid_command(env, &args)
}

pub fn dir_is_empty(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
