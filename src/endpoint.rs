//! Passive endpoint process lifecycle.
//!
//! The passive party does not serve HTTP in-process. It spawns the
//! `dmserver` binary on the task's allocated port and waits for it to exit,
//! which happens once the active party posts `/shutdown`. Output is
//! captured so a crash can be reported with its stderr.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{error, info};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Environment override naming the endpoint binary.
pub const SERVER_BIN_ENV: &str = "TEE_DM_SERVER_BIN";

/// Default binary name, resolved next to the current executable.
const SERVER_BIN_NAME: &str = "dmserver";

/// Terminal state of an endpoint process.
#[derive(Debug)]
pub enum ExitOutcome {
    Success,
    Failure { code: Option<i32>, stderr: String },
}

/// Locates the endpoint binary: the `TEE_DM_SERVER_BIN` override when set,
/// otherwise a sibling of the current executable.
pub fn server_binary() -> Result<PathBuf> {
    if let Ok(path) = env::var(SERVER_BIN_ENV) {
        return Ok(PathBuf::from(path));
    }
    let exe = env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        Error::Config("current executable has no parent directory".into())
    })?;
    Ok(dir.join(SERVER_BIN_NAME))
}

/// Spawns the endpoint binary and waits for it to exit.
pub async fn run_endpoint(
    program: &Path,
    port: u16,
    catalog_endpoint: &str,
) -> Result<ExitOutcome> {
    info!("Starting endpoint {} on port {port}", program.display());
    let output = Command::new(program)
        .arg("--port")
        .arg(port.to_string())
        .arg("--data-mesh-endpoint")
        .arg(catalog_endpoint)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if output.status.success() {
        info!("Endpoint exited cleanly");
        if !output.stdout.is_empty() {
            info!(
                "Endpoint output:\n{}",
                String::from_utf8_lossy(&output.stdout)
            );
        }
        Ok(ExitOutcome::Success)
    } else {
        Ok(ExitOutcome::Failure {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs the passive side of a transfer: serve the peer endpoint on `port`
/// until the active party shuts it down, and fail the task if the endpoint
/// process fails.
pub async fn run_passive(port: u16, catalog_endpoint: &str) -> Result<()> {
    let program = server_binary()?;
    match run_endpoint(&program, port, catalog_endpoint).await? {
        ExitOutcome::Success => Ok(()),
        ExitOutcome::Failure { code, stderr } => {
            error!("Endpoint process failed with code {code:?}");
            Err(Error::Process { code, stderr })
        }
    }
}
