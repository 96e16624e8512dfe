//! Core error types for mccli

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for credential resolution and copy planning
#[derive(Error, Debug)]
pub enum McError {
    /// No motley_cue service answered on any candidate URL
    #[error(
        "No motley_cue service found on host '{host}' on port 443, 8443 or 8080. \
         Please specify motley_cue endpoint via --mc-endpoint."
    )]
    EndpointUnreachable { host: String },

    /// No access token source configured and none could be inferred
    #[error("No access token found.\nTry 'mccli --help' for help on specifying the access token source.")]
    NoCredentialSource,

    /// More than one credential flag was given on the command line
    #[error("Options {0} are mutually exclusive, use only one access token source")]
    ConflictingSources(String),

    /// oidc-agent socket missing or unreachable
    #[error("oidc-agent is not available: {0}")]
    AgentUnavailable(String),

    /// oidc-agent refused or failed the token request
    #[error("Failed to get access token for {target}: {reason}")]
    TokenRequestFailed { target: String, reason: String },

    /// Provided token is expired and no other source worked
    #[error(
        "The provided access token is expired. Have you considered using 'oidc-agent' to always have valid tokens?\n    \
         https://github.com/indigo-dc/oidc-agent"
    )]
    TokenExpired,

    /// Token too long for SSH and the service offers no one-time password
    #[error(
        "Sorry, your token is too long ({0} >= 1024) and cannot be used for SSH authentication. \
         Please ask your OP admin if they can release shorter tokens, \
         or the service admin if they can support one-time passwords."
    )]
    TokenTooLong(usize),

    /// The mapping API rejected the token or has no mapping
    #[error("Failed to get local username [HTTP {status}]: {detail}")]
    AuthMappingFailed { status: u16, detail: String },

    /// Copy direction not handled (local->local or remote->remote)
    #[error("{0}")]
    UnsupportedCopyDirection(String),

    /// Malformed scp operand or ssh destination
    #[error("Invalid argument {0}")]
    InvalidOperand(String),

    /// Local file missing
    #[error("{}: No such file or directory", .0.display())]
    NotFound(PathBuf),

    /// Local source is a directory and recursion was not requested
    #[error("{}: not a regular file", .0.display())]
    IsADirectory(PathBuf),

    /// Local file not readable
    #[error("{}: Permission denied", .0.display())]
    PermissionDenied(PathBuf),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl McError {
    /// Process exit code for this error kind.
    ///
    /// Usage errors share clap's code 2; every resolver stage gets its own
    /// code so scripts can tell them apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            McError::ConflictingSources(_) | McError::InvalidOperand(_) => 2,
            McError::EndpointUnreachable { .. } => 3,
            McError::NoCredentialSource => 4,
            McError::AgentUnavailable(_) => 5,
            McError::TokenRequestFailed { .. }
            | McError::TokenExpired
            | McError::TokenTooLong(_) => 6,
            McError::AuthMappingFailed { .. } => 7,
            McError::UnsupportedCopyDirection(_) => 8,
            McError::NotFound(_) | McError::IsADirectory(_) | McError::PermissionDenied(_) => 9,
            McError::Http(_) | McError::Config(_) | McError::Io(_) => 1,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
