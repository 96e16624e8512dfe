//! motley_cue API client
//!
//! motley_cue runs next to the SSH daemon and maps an OIDC identity to a
//! local account. The endpoints used here:
//!
//! | Path                  | Purpose                                   |
//! |-----------------------|-------------------------------------------|
//! | `/`                   | liveness probe                            |
//! | `/info`               | supported issuers (`supported_OPs`)       |
//! | `/info/authorisation` | audience the token must carry             |
//! | `/user/get_status`    | is the account deployed, and its name     |
//! | `/user/deploy`        | create the account                        |
//! | `/user/generate_otp`  | register a one-time password for SSH      |

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::McError;

/// Outcome of probing a candidate endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Answered with HTTP 200
    Found,
    /// TLS handshake or certificate verification failed
    TlsFailure,
    /// Unreachable or answered with another status
    Missing,
}

/// Checks whether a motley_cue service answers at a URL
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Whether the service registered a one-time password
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OtpStatus {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub successful: bool,
}

/// Token-bearing calls to a motley_cue service
#[async_trait]
pub trait MappingApi: Send + Sync {
    /// Issuers the service accepts tokens from
    async fn supported_issuers(&self, endpoint: &str) -> Result<Vec<String>, McError>;

    /// Audience required in the token, if any
    async fn audience(&self, endpoint: &str, token: &str) -> Result<Option<String>, McError>;

    /// Local username, deploying the account if needed
    async fn local_username(&self, endpoint: &str, token: &str) -> Result<String, McError>;

    /// Ask the service to accept a hash of `token` as SSH password
    async fn generate_otp(&self, endpoint: &str, token: &str) -> Result<OtpStatus, McError>;
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default, rename = "supported_OPs")]
    supported_ops: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorisationResponse {
    audience: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub state: String,
    #[serde(default)]
    pub message: String,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    pub ssh_user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
    error: Option<String>,
    error_description: Option<String>,
}

/// HTTP client for motley_cue services
#[derive(Debug, Clone)]
pub struct MotleyCueClient {
    client: reqwest::Client,
}

impl MotleyCueClient {
    /// Build a client. With `verify_tls` off, invalid certificates are
    /// accepted for every request made through it.
    pub fn new(verify_tls: bool, timeout: Duration) -> Result<Self, McError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        if !verify_tls {
            tracing::warn!(
                "InsecureRequestWarning: TLS certificate verification is disabled for motley_cue \
                 endpoints. Adding certificate verification is strongly advised."
            );
        }
        Ok(Self { client })
    }

    async fn get(&self, endpoint: &str, path: &str, token: &str) -> Result<reqwest::Response, McError> {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
        tracing::debug!("GET {}", url);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }
}

#[async_trait]
impl EndpointProbe for MotleyCueClient {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => ProbeOutcome::Found,
            Ok(resp) => {
                tracing::debug!("{} answered with HTTP {}", url, resp.status());
                ProbeOutcome::Missing
            }
            Err(e) if is_tls_error(&e) => {
                tracing::debug!("TLS failure on {}: {}", url, e);
                ProbeOutcome::TlsFailure
            }
            Err(e) => {
                tracing::debug!("No answer from {}: {}", url, e);
                ProbeOutcome::Missing
            }
        }
    }
}

#[async_trait]
impl MappingApi for MotleyCueClient {
    async fn supported_issuers(&self, endpoint: &str) -> Result<Vec<String>, McError> {
        let url = format!("{}/info", endpoint.trim_end_matches('/'));
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let info: InfoResponse = resp.json().await?;
        Ok(info.supported_ops)
    }

    async fn audience(&self, endpoint: &str, token: &str) -> Result<Option<String>, McError> {
        let resp = self.get(endpoint, "/info/authorisation", token).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let info: AuthorisationResponse = resp.json().await?;
        Ok(info.audience.and_then(audience_value))
    }

    async fn local_username(&self, endpoint: &str, token: &str) -> Result<String, McError> {
        let resp = self.get(endpoint, "/user/get_status", token).await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(mapping_error(status.as_u16(), &body));
        }

        let parsed: StatusResponse = serde_json::from_str(&body).map_err(|e| {
            McError::AuthMappingFailed {
                status: status.as_u16(),
                detail: format!("unexpected response: {}", e),
            }
        })?;

        if parsed.state == "not_deployed" {
            tracing::info!("Local account not deployed yet, deploying...");
            let resp = self.get(endpoint, "/user/deploy", token).await?;
            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(mapping_error(status.as_u16(), &body));
            }
            let deployed: StatusResponse = serde_json::from_str(&body).map_err(|e| {
                McError::AuthMappingFailed {
                    status: status.as_u16(),
                    detail: format!("unexpected response: {}", e),
                }
            })?;
            return deployed
                .credentials
                .and_then(|c| c.ssh_user)
                .ok_or_else(|| McError::AuthMappingFailed {
                    status: status.as_u16(),
                    detail: "deploy response carries no ssh_user".to_string(),
                });
        }

        username_from_status(&parsed).ok_or_else(|| McError::AuthMappingFailed {
            status: status.as_u16(),
            detail: format!("could not read username from '{}'", parsed.message),
        })
    }

    async fn generate_otp(&self, endpoint: &str, token: &str) -> Result<OtpStatus, McError> {
        let resp = self.get(endpoint, "/user/generate_otp", token).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            tracing::error!(
                "Failed on generate_otp: [HTTP {}] {}",
                status.as_u16(),
                error_detail(&body)
            );
            return Ok(OtpStatus::default());
        }
        Ok(resp.json().await?)
    }
}

/// Username from a deployed-status reply: the second word of `message`,
/// else `credentials.ssh_user`.
pub(crate) fn username_from_status(status: &StatusResponse) -> Option<String> {
    status
        .message
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
        .or_else(|| status.credentials.as_ref().and_then(|c| c.ssh_user.clone()))
}

fn audience_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Array(items) => items
            .into_iter()
            .find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn mapping_error(status: u16, body: &str) -> McError {
    McError::AuthMappingFailed {
        status,
        detail: error_detail(body),
    }
}

/// Human-readable error out of a motley_cue or OIDC error body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: Some(serde_json::Value::String(detail)),
            ..
        }) => detail,
        Ok(ErrorResponse {
            detail: Some(detail),
            ..
        }) => detail.to_string(),
        Ok(ErrorResponse {
            error: Some(error),
            error_description,
            ..
        }) => match error_description {
            Some(desc) => format!("{} - {}", error, desc),
            None => error,
        },
        _ if body.trim().is_empty() => "no details given".to_string(),
        _ => body.trim().to_string(),
    }
}

fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            return true;
        }
        source = e.source();
    }
    false
}
