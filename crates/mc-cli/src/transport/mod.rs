//! Transport dispatch
//!
//! The SSH protocol itself is left to the system `ssh`/`scp` binaries. The
//! access token reaches them through `SSH_ASKPASS`, with this binary acting
//! as the askpass program.

pub mod askpass;
pub mod dry_run;
mod process;

pub use process::SystemTransport;

use async_trait::async_trait;

use mc_core::McError;

/// Port assumed by ssh and scp when none is given
pub const DEFAULT_SSH_PORT: u16 = 22;

/// External client to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Ssh,
    Scp,
}

impl Program {
    pub fn binary(&self) -> &'static str {
        match self {
            Program::Ssh => "ssh",
            Program::Scp => "scp",
        }
    }
}

/// Options fixed for the whole invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub port: u16,
    pub recursive: bool,
    pub preserve_times: bool,
    pub dry_run: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            recursive: false,
            preserve_times: false,
            dry_run: false,
        }
    }
}

/// One run of ssh or scp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: Program,
    pub args: Vec<String>,
    pub password: String,
}

impl Invocation {
    /// `ssh -p PORT user@host [command]`
    pub fn ssh(
        options: &TransportOptions,
        username: &str,
        host: &str,
        command: Option<&str>,
        password: &str,
    ) -> Self {
        let mut args = vec![
            "-p".to_string(),
            options.port.to_string(),
            format!("{}@{}", username, host),
        ];
        if let Some(command) = command {
            args.push(command.to_string());
        }
        Self {
            program: Program::Ssh,
            args,
            password: password.to_string(),
        }
    }

    /// `scp -P PORT [-r] [-p] -- source target`
    pub fn scp(options: &TransportOptions, source: String, target: String, password: &str) -> Self {
        let mut args = vec!["-P".to_string(), options.port.to_string()];
        if options.recursive {
            args.push("-r".to_string());
        }
        if options.preserve_times {
            args.push("-p".to_string());
        }
        args.push("--".to_string());
        args.push(source);
        args.push(target);
        Self {
            program: Program::Scp,
            args,
            password: password.to_string(),
        }
    }
}

/// Runs an invocation to completion and reports its exit code
#[async_trait]
pub trait Transport: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<i32, McError>;
}
