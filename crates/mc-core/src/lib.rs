//! mc-core: credential resolution for OIDC-authenticated SSH
//!
//! This crate finds the motley_cue service for a host, obtains an access
//! token (directly, from oidc-agent, or via the issuers the service
//! supports) and maps it to the local username on that host.

pub mod agent;
pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod operand;
pub mod resolve;

pub use credentials::{CredentialFlags, CredentialSource};
pub use error::{ConfigError, McError};
pub use operand::{Destination, Operand};
pub use resolve::{ResolvedSession, ResolverSettings, SessionResolver};
