//! Client configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Defaults read from `config.toml`. Command-line flags and environment
/// variables take precedence over every field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// Skip TLS certificate verification for motley_cue endpoints
    pub insecure: bool,

    /// oidc-agent account used when no other source is given
    pub oa_account: Option<String>,

    /// Issuer URL used when no other source is given
    pub issuer: Option<String>,

    /// SSH port used when `-p`/`-P` is not given
    pub port: Option<u16>,

    /// Per-host motley_cue endpoints, keyed by SSH hostname
    pub endpoints: HashMap<String, String>,

    /// Timeout for each HTTP request to a motley_cue service
    #[serde(with = "super::serde_utils::duration_secs")]
    pub http_timeout: Duration,

    /// Minimum remaining validity requested from oidc-agent, in seconds
    pub min_valid_period: u64,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            oa_account: None,
            issuer: None,
            port: None,
            endpoints: HashMap::new(),
            http_timeout: Duration::from_secs(10),
            min_valid_period: 60,
        }
    }
}
