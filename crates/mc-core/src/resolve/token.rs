//! Access token resolution

use sha2::{Digest, Sha512};

use crate::agent::{AgentRequest, AgentTarget, TokenAgent};
use crate::api::MappingApi;
use crate::credentials::{normalize_issuer, oidc_gen_command, CredentialSource};
use crate::error::McError;
use crate::jwt;

/// SSH servers refuse passwords of this length or longer
pub const MAX_PASSWORD_LEN: usize = 1024;

/// A token ready to be used as SSH password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    /// The OIDC access token, sent to motley_cue as bearer
    pub access_token: String,
    /// What ssh sends as password; a one-time password for long tokens
    pub password: String,
    /// Shell fragment producing `password`, for dry-run output
    pub token_command: String,
}

/// Obtain an access token for `endpoint` and make it usable as a password.
pub async fn resolve_token(
    source: Option<&CredentialSource>,
    endpoint: &str,
    api: &dyn MappingApi,
    agent: &dyn TokenAgent,
) -> Result<ResolvedToken, McError> {
    let (token, token_command) = obtain_token(source, endpoint, api, agent).await?;
    fit_for_ssh(token, token_command, endpoint, api).await
}

async fn obtain_token(
    source: Option<&CredentialSource>,
    endpoint: &str,
    api: &dyn MappingApi,
    agent: &dyn TokenAgent,
) -> Result<(String, String), McError> {
    let mut expired = false;

    match source {
        Some(provided @ CredentialSource::Token(token)) => {
            match jwt::seconds_left(token, jwt::now()) {
                None => {
                    tracing::warn!(
                        "Could not get expiration date from provided token, it might not be a JWT. Using it anyway..."
                    );
                    return Ok((token.clone(), provided.token_command()));
                }
                Some(left) if left > 0 => {
                    tracing::info!("Token valid for {} more seconds, using provided token.", left);
                    return Ok((token.clone(), provided.token_command()));
                }
                Some(left) => {
                    tracing::warn!(
                        "Token is expired for {} seconds. Looking for another source for access token...",
                        -left
                    );
                    expired = true;
                }
            }
        }
        Some(CredentialSource::AgentAccount(account)) => {
            tracing::info!("Using oidc-agent account: {}", account);
            return from_agent(AgentTarget::Account(account.clone()), endpoint, api, agent)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        "Are you sure this account is loaded? Load it with:\n    oidc-add {}",
                        account
                    );
                    tracing::warn!(
                        "Are you sure this account is configured? Create it with:\n    oidc-gen {}",
                        account
                    );
                    e
                });
        }
        Some(CredentialSource::Issuer(issuer)) => {
            let issuer = normalize_issuer(issuer);
            tracing::info!("Using issuer: {}", issuer);
            return from_agent(AgentTarget::Issuer(issuer.clone()), endpoint, api, agent)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        "Are you sure the issuer URL is correct or that you have an account configured \
                         with oidc-agent for this issuer? Create it with:\n    {}",
                        oidc_gen_command(&issuer)
                    );
                    e
                });
        }
        None => tracing::info!("No access token source provided."),
    }

    tracing::info!("Trying to get list of supported AT issuers from {}...", endpoint);
    let issuers = api.supported_issuers(endpoint).await.unwrap_or_else(|e| {
        tracing::debug!("Could not get supported issuers: {}", e);
        Vec::new()
    });

    match issuers.as_slice() {
        [issuer] => {
            tracing::info!(
                "Using the only issuer supported on service to retrieve token from oidc-agent: {}",
                issuer
            );
            match from_agent(AgentTarget::Issuer(issuer.clone()), endpoint, api, agent).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    tracing::warn!(
                        "If you don't have an oidc-agent account configured for this issuer, create it with:\n    {}",
                        oidc_gen_command(issuer)
                    );
                    if !expired {
                        return Err(e);
                    }
                    tracing::warn!("{}", e);
                }
            }
        }
        [] => {}
        many => tracing::warn!(
            "Multiple issuers supported on service, I don't know which one to use:\n    {}",
            many.join("\n    ")
        ),
    }

    if expired {
        Err(McError::TokenExpired)
    } else {
        Err(McError::NoCredentialSource)
    }
}

/// Get a token from the agent, re-requesting it when the service wants a
/// specific audience.
async fn from_agent(
    target: AgentTarget,
    endpoint: &str,
    api: &dyn MappingApi,
    agent: &dyn TokenAgent,
) -> Result<(String, String), McError> {
    let request = AgentRequest::new(target);
    let token = agent.access_token(&request).await?;

    let audience = api.audience(endpoint, &token).await.unwrap_or_else(|e| {
        tracing::debug!("Could not get audience from service: {}", e);
        None
    });

    match audience {
        Some(audience) => {
            tracing::debug!("Service requires audience '{}', requesting new token", audience);
            let request = request.with_audience(Some(audience));
            let token = agent.access_token(&request).await?;
            Ok((token, request.token_command()))
        }
        None => Ok((token, request.token_command())),
    }
}

async fn fit_for_ssh(
    token: String,
    token_command: String,
    endpoint: &str,
    api: &dyn MappingApi,
) -> Result<ResolvedToken, McError> {
    if token.len() < MAX_PASSWORD_LEN {
        return Ok(ResolvedToken {
            password: token.clone(),
            access_token: token,
            token_command,
        });
    }

    let otp = api.generate_otp(endpoint, &token).await?;
    if !(otp.supported && otp.successful) {
        return Err(McError::TokenTooLong(token.len()));
    }

    let password = one_time_password(&token);
    tracing::debug!("Generated one-time password for use with SSH instead of long access token.");
    Ok(ResolvedToken {
        access_token: token,
        token_command: password.clone(),
        password,
    })
}

/// Hex SHA-512 of the token, the password motley_cue registers for OTP
pub fn one_time_password(token: &str) -> String {
    hex::encode(Sha512::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OtpStatus;
    use crate::jwt::make_token;
    use crate::resolve::testing::{FakeAgent, FakeApi};

    const EP: &str = "https://host";

    #[tokio::test]
    async fn test_plain_token_used_as_is() {
        let api = FakeApi::default();
        let agent = FakeAgent::default();
        let source = CredentialSource::Token("opaque".to_string());
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, "opaque");
        assert_eq!(resolved.password, "opaque");
        assert_eq!(resolved.token_command, "'opaque'");
        assert!(agent.requests().is_empty());
    }

    #[tokio::test]
    async fn test_valid_jwt_used_as_is() {
        let token = make_token(&format!(r#"{{"exp":{}}}"#, jwt::now() + 3600));
        let api = FakeApi::default();
        let agent = FakeAgent::default();
        let source = CredentialSource::Token(token.clone());
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, token);
    }

    #[tokio::test]
    async fn test_expired_jwt_without_fallback() {
        let token = make_token(r#"{"exp":1000}"#);
        let api = FakeApi::default();
        let agent = FakeAgent::default();
        let source = CredentialSource::Token(token);
        let err = resolve_token(Some(&source), EP, &api, &agent).await.unwrap_err();
        assert!(matches!(err, McError::TokenExpired));
    }

    #[tokio::test]
    async fn test_expired_jwt_falls_back_to_service_issuer() {
        let token = make_token(r#"{"exp":1000}"#);
        let api = FakeApi {
            issuers: vec!["https://iss".to_string()],
            ..Default::default()
        };
        let agent = FakeAgent::with_token("fresh");
        let source = CredentialSource::Token(token);
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, "fresh");
        assert_eq!(resolved.token_command, "`oidc-token https://iss`");
    }

    #[tokio::test]
    async fn test_agent_account() {
        let api = FakeApi::default();
        let agent = FakeAgent::with_token("agent-token");
        let source = CredentialSource::AgentAccount("egi".to_string());
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, "agent-token");
        assert_eq!(resolved.token_command, "`oidc-token egi`");
        assert_eq!(
            agent.requests(),
            vec![AgentRequest::new(AgentTarget::Account("egi".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_agent_failure_is_not_masked() {
        let api = FakeApi {
            issuers: vec!["https://iss".to_string()],
            ..Default::default()
        };
        let agent = FakeAgent::unavailable();
        let source = CredentialSource::AgentAccount("egi".to_string());
        let err = resolve_token(Some(&source), EP, &api, &agent).await.unwrap_err();
        assert!(matches!(err, McError::AgentUnavailable(_)));
        assert_eq!(agent.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_issuer_without_scheme_and_audience() {
        let api = FakeApi {
            audience: Some("ssh-host".to_string()),
            ..Default::default()
        };
        let agent = FakeAgent::with_token("tok");
        let source = CredentialSource::Issuer("aai.egi.eu/oidc".to_string());
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(
            resolved.token_command,
            "`oidc-token --aud ssh-host https://aai.egi.eu/oidc`"
        );
        let requests = agent.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].audience.as_deref(), Some("ssh-host"));
    }

    #[tokio::test]
    async fn test_no_source_single_service_issuer() {
        let api = FakeApi {
            issuers: vec!["https://only".to_string()],
            ..Default::default()
        };
        let agent = FakeAgent::with_token("tok");
        let resolved = resolve_token(None, EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, "tok");
        assert_eq!(
            agent.requests()[0].target,
            AgentTarget::Issuer("https://only".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_source_many_issuers() {
        let api = FakeApi {
            issuers: vec!["https://a".to_string(), "https://b".to_string()],
            ..Default::default()
        };
        let agent = FakeAgent::with_token("tok");
        let err = resolve_token(None, EP, &api, &agent).await.unwrap_err();
        assert!(matches!(err, McError::NoCredentialSource));
        assert!(agent.requests().is_empty());
    }

    #[tokio::test]
    async fn test_long_token_uses_otp() {
        let long = "x".repeat(MAX_PASSWORD_LEN);
        let api = FakeApi {
            otp: OtpStatus {
                supported: true,
                successful: true,
            },
            ..Default::default()
        };
        let agent = FakeAgent::default();
        let source = CredentialSource::Token(long.clone());
        let resolved = resolve_token(Some(&source), EP, &api, &agent).await.unwrap();
        assert_eq!(resolved.access_token, long);
        assert_eq!(resolved.password, one_time_password(&long));
        assert_eq!(resolved.password.len(), 128);
        assert_eq!(resolved.token_command, resolved.password);
    }

    #[tokio::test]
    async fn test_long_token_without_otp_support() {
        let long = "x".repeat(2000);
        let api = FakeApi::default();
        let agent = FakeAgent::default();
        let source = CredentialSource::Token(long);
        let err = resolve_token(Some(&source), EP, &api, &agent).await.unwrap_err();
        assert!(matches!(err, McError::TokenTooLong(2000)));
    }
}
