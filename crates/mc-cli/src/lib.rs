//! mccli: SSH client wrapper for OIDC-based authentication
//!
//! Provides the `mccli` CLI, which logs in to motley_cue-managed hosts with
//! an OIDC access token as password, delegating the actual connection to
//! the system `ssh` and `scp` binaries.

pub mod args;
pub mod commands;
pub mod output;
pub mod transport;
