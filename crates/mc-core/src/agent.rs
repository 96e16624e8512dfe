//! oidc-agent client
//!
//! Talks to a running oidc-agent over the UNIX socket named by `OIDC_SOCK`.
//! Each request is a single JSON object; the agent answers with one JSON
//! object and the connection is dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::McError;

/// Environment variable holding the agent socket path
pub const OIDC_SOCK_ENV: &str = "OIDC_SOCK";

/// Sent to the agent so it can tell the user who is asking
pub const APPLICATION_HINT: &str = "mccli";

/// What the agent should issue a token for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTarget {
    Account(String),
    Issuer(String),
}

impl AgentTarget {
    fn label(&self) -> String {
        match self {
            AgentTarget::Account(account) => format!("oidc-agent account '{}'", account),
            AgentTarget::Issuer(issuer) => format!("issuer '{}'", issuer),
        }
    }
}

/// A token request to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub target: AgentTarget,
    pub audience: Option<String>,
}

impl AgentRequest {
    pub fn new(target: AgentTarget) -> Self {
        Self {
            target,
            audience: None,
        }
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Equivalent `oidc-token` shell fragment, for dry-run output
    pub fn token_command(&self) -> String {
        let aud = self
            .audience
            .as_ref()
            .map(|a| format!("--aud {} ", a))
            .unwrap_or_default();
        match &self.target {
            AgentTarget::Account(account) => format!("`oidc-token {}{}`", aud, account),
            AgentTarget::Issuer(issuer) => format!("`oidc-token {}{}`", aud, issuer),
        }
    }
}

/// Source of access tokens
#[async_trait]
pub trait TokenAgent: Send + Sync {
    /// Request an access token
    async fn access_token(&self, request: &AgentRequest) -> Result<String, McError>;
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    request: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<&'a str>,
    min_valid_period: u64,
    application_hint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    status: String,
    access_token: Option<String>,
    error: Option<String>,
    help: Option<String>,
}

/// Client for a local oidc-agent
#[derive(Debug, Clone)]
pub struct OidcAgentClient {
    socket: Option<PathBuf>,
    min_valid_period: u64,
}

impl OidcAgentClient {
    /// Client using the socket from `OIDC_SOCK`
    pub fn from_env(min_valid_period: u64) -> Self {
        let socket = std::env::var_os(OIDC_SOCK_ENV)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self {
            socket,
            min_valid_period,
        }
    }

    /// Client for an explicit socket path
    pub fn with_socket(socket: impl Into<PathBuf>, min_valid_period: u64) -> Self {
        Self {
            socket: Some(socket.into()),
            min_valid_period,
        }
    }

    fn encode(&self, request: &AgentRequest) -> Result<Vec<u8>, McError> {
        let (account, issuer) = match &request.target {
            AgentTarget::Account(a) => (Some(a.as_str()), None),
            AgentTarget::Issuer(i) => (None, Some(i.as_str())),
        };
        let wire = WireRequest {
            request: "access_token",
            account,
            issuer,
            min_valid_period: self.min_valid_period,
            application_hint: APPLICATION_HINT,
            audience: request.audience.as_deref(),
        };
        serde_json::to_vec(&wire).map_err(|e| McError::AgentUnavailable(e.to_string()))
    }

    #[cfg(unix)]
    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, McError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        let socket = self.socket.as_ref().ok_or_else(|| {
            McError::AgentUnavailable(format!(
                "{} is not set. Is oidc-agent running?",
                OIDC_SOCK_ENV
            ))
        })?;

        tracing::debug!("Connecting to oidc-agent at {:?}", socket);
        let mut stream = UnixStream::connect(socket).await.map_err(|e| {
            McError::AgentUnavailable(format!("could not connect to {:?}: {}", socket, e))
        })?;

        stream
            .write_all(payload)
            .await
            .map_err(|e| McError::AgentUnavailable(e.to_string()))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|e| McError::AgentUnavailable(e.to_string()))?;
            response.extend_from_slice(&buf[..n]);
            if n == 0 || serde_json::from_slice::<serde_json::Value>(&response).is_ok() {
                break;
            }
        }
        Ok(response)
    }

    #[cfg(not(unix))]
    async fn exchange(&self, _payload: &[u8]) -> Result<Vec<u8>, McError> {
        Err(McError::AgentUnavailable(
            "oidc-agent sockets are only supported on unix".to_string(),
        ))
    }
}

/// Turn an agent reply into a token or a request failure
fn decode(target: &AgentTarget, bytes: &[u8]) -> Result<String, McError> {
    let response: WireResponse =
        serde_json::from_slice(bytes).map_err(|e| McError::TokenRequestFailed {
            target: target.label(),
            reason: format!("invalid response from oidc-agent: {}", e),
        })?;

    match (response.status.as_str(), response.access_token) {
        ("success", Some(token)) if !token.is_empty() => Ok(token),
        _ => {
            let mut reason = response
                .error
                .unwrap_or_else(|| "oidc-agent returned no access token".to_string());
            if let Some(help) = response.help {
                reason.push_str(&format!(" ({})", help));
            }
            Err(McError::TokenRequestFailed {
                target: target.label(),
                reason,
            })
        }
    }
}

#[async_trait]
impl TokenAgent for OidcAgentClient {
    async fn access_token(&self, request: &AgentRequest) -> Result<String, McError> {
        let payload = self.encode(request)?;
        let bytes = self.exchange(&payload).await?;
        decode(&request.target, &bytes)
    }
}
