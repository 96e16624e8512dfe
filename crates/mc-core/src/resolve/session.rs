//! Per-host session resolution

use std::collections::HashMap;

use crate::agent::{OidcAgentClient, TokenAgent};
use crate::api::{EndpointProbe, MappingApi, MotleyCueClient};
use crate::config::McConfig;
use crate::credentials::CredentialSource;
use crate::error::McError;

use super::endpoint::resolve_endpoint;
use super::token::resolve_token;

/// Endpoint selection settings for one invocation
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    /// `--mc-endpoint`, applied to every host
    pub endpoint_override: Option<String>,
    /// Per-host endpoints from the config file
    pub endpoints: HashMap<String, String>,
    /// Verify TLS certificates of motley_cue endpoints
    pub verify_tls: bool,
}

/// Everything needed to log in to one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub host: String,
    pub endpoint: String,
    pub username: String,
    pub access_token: String,
    pub password: String,
    pub token_command: String,
    pub verify_tls: bool,
}

/// Resolves and memoises sessions for the hosts of a single command
pub struct SessionResolver {
    settings: ResolverSettings,
    source: Option<CredentialSource>,
    probe: Box<dyn EndpointProbe>,
    api: Box<dyn MappingApi>,
    agent: Box<dyn TokenAgent>,
    sessions: HashMap<(String, Option<String>), ResolvedSession>,
}

impl SessionResolver {
    pub fn new(
        settings: ResolverSettings,
        source: Option<CredentialSource>,
        probe: Box<dyn EndpointProbe>,
        api: Box<dyn MappingApi>,
        agent: Box<dyn TokenAgent>,
    ) -> Self {
        Self {
            settings,
            source,
            probe,
            api,
            agent,
            sessions: HashMap::new(),
        }
    }

    /// Resolver backed by real motley_cue services and the local oidc-agent
    pub fn connect(
        settings: ResolverSettings,
        source: Option<CredentialSource>,
        config: &McConfig,
    ) -> Result<Self, McError> {
        let client = MotleyCueClient::new(settings.verify_tls, config.http_timeout)?;
        let agent = OidcAgentClient::from_env(config.min_valid_period);
        Ok(Self::new(
            settings,
            source,
            Box::new(client.clone()),
            Box::new(client),
            Box::new(agent),
        ))
    }

    /// The active credential source
    pub fn source(&self) -> Option<&CredentialSource> {
        self.source.as_ref()
    }

    /// Resolve the session for `host`.
    ///
    /// With an explicit `user` the username mapping call is skipped; the
    /// token is still resolved since it is the SSH password.
    pub async fn session(
        &mut self,
        host: &str,
        user: Option<&str>,
    ) -> Result<ResolvedSession, McError> {
        let key = (host.to_string(), user.map(str::to_string));
        if let Some(session) = self.sessions.get(&key) {
            tracing::debug!("Reusing resolved session for {}", host);
            return Ok(session.clone());
        }

        let explicit = self
            .settings
            .endpoint_override
            .as_deref()
            .or_else(|| self.settings.endpoints.get(host).map(String::as_str));
        let endpoint = resolve_endpoint(self.probe.as_ref(), explicit, host).await?;
        tracing::debug!("mc endpoint: {}", endpoint);

        let token = resolve_token(
            self.source.as_ref(),
            &endpoint,
            self.api.as_ref(),
            self.agent.as_ref(),
        )
        .await?;

        let username = match user {
            Some(user) => {
                tracing::debug!("Using explicit user '{}' for {}", user, host);
                user.to_string()
            }
            None => {
                tracing::debug!("Getting username from motley_cue service on {}", host);
                self.api
                    .local_username(&endpoint, &token.access_token)
                    .await?
            }
        };
        tracing::info!("Using local username '{}' on {}", username, host);

        let session = ResolvedSession {
            host: host.to_string(),
            endpoint,
            username,
            access_token: token.access_token,
            password: token.password,
            token_command: token.token_command,
            verify_tls: self.settings.verify_tls,
        };
        self.sessions.insert(key, session.clone());
        Ok(session)
    }
}
