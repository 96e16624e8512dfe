//! ssh/scp child processes

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use mc_core::McError;

use super::askpass::{ASKPASS_PASSWORD_ENV, SSH_ASKPASS_ENV, SSH_ASKPASS_REQUIRE_ENV};
use super::{Invocation, Transport};

/// Runs the system ssh/scp with inherited stdio
pub struct SystemTransport {
    askpass: PathBuf,
}

impl SystemTransport {
    /// Transport that uses the running executable as askpass helper
    pub fn new() -> Result<Self, McError> {
        Ok(Self {
            askpass: std::env::current_exe()?,
        })
    }
}

#[async_trait]
impl Transport for SystemTransport {
    async fn run(&self, invocation: &Invocation) -> Result<i32, McError> {
        let program = invocation.program.binary();
        tracing::debug!("Running {} {}", program, invocation.args.join(" "));

        let status = Command::new(program)
            .args(&invocation.args)
            .env(SSH_ASKPASS_ENV, &self.askpass)
            .env(SSH_ASKPASS_REQUIRE_ENV, "force")
            .env(ASKPASS_PASSWORD_ENV, &invocation.password)
            .status()
            .await
            .map_err(|e| {
                McError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to run {}: {}", program, e),
                ))
            })?;

        // Killed by a signal: report it the way ssh reports a lost connection.
        let code = status.code().unwrap_or(255);
        if code != 0 {
            tracing::debug!("{} exited with status {}", program, code);
        }
        Ok(code)
    }
}
