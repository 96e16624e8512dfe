//! CLI command implementations

mod scp;
mod sftp;
mod ssh;

pub use scp::{plan_copy, scp_command, CopyDirection, CopyPlan};
pub use sftp::sftp_command;
pub use ssh::ssh_command;

use mc_core::config::McConfig;
use mc_core::{CredentialSource, ResolvedSession, ResolverSettings, SessionResolver};

use crate::args::CommonArgs;
use crate::transport::DEFAULT_SSH_PORT;

/// Endpoint and TLS settings from flags and config
pub fn resolver_settings(common: &CommonArgs, config: &McConfig) -> ResolverSettings {
    ResolverSettings {
        endpoint_override: common.mc_endpoint.clone(),
        endpoints: config.endpoints.clone(),
        verify_tls: !(common.insecure || config.insecure),
    }
}

/// `-p`/`-P` if given, else the config port, else 22
pub fn effective_port(flag: Option<u16>, config: &McConfig) -> u16 {
    flag.or(config.port).unwrap_or(DEFAULT_SSH_PORT)
}

/// Password fragment shown in dry-run output.
///
/// A resolved session knows the audience and one-time password the service
/// wants; the bare source is only used when nothing had to be resolved.
fn dry_run_password(source: Option<&CredentialSource>, session: Option<&ResolvedSession>) -> String {
    match (session, source) {
        (Some(session), _) => session.token_command.clone(),
        (None, Some(source)) => source.token_command(),
        (None, None) => "''".to_string(),
    }
}

/// Resolve `host` unless the user is already known and a source is set.
async fn session_for_dry_run(
    resolver: &mut SessionResolver,
    host: &str,
    user: Option<&str>,
) -> anyhow::Result<Option<ResolvedSession>> {
    match user {
        Some(_) if resolver.source().is_some() => Ok(None),
        _ => Ok(Some(resolver.session(host, user).await?)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use mc_core::agent::{AgentRequest, TokenAgent};
    use mc_core::api::{EndpointProbe, MappingApi, OtpStatus, ProbeOutcome};
    use mc_core::{CredentialSource, McError, ResolverSettings, SessionResolver};

    use crate::transport::{Invocation, Transport};

    /// Records every network-facing call a resolver makes
    #[derive(Default)]
    pub struct NetworkLog {
        pub calls: Mutex<Vec<String>>,
    }

    impl NetworkLog {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    struct Probe(Arc<NetworkLog>);

    #[async_trait]
    impl EndpointProbe for Probe {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            self.0.push(format!("probe {}", url));
            ProbeOutcome::Found
        }
    }

    /// Canned motley_cue and oidc-agent behaviour
    #[derive(Clone, Default)]
    pub struct Service {
        pub username: String,
        pub audience: Option<String>,
        pub otp: OtpStatus,
        pub agent_token: Option<String>,
    }

    impl Service {
        pub fn mapping_to(username: &str) -> Self {
            Self {
                username: username.to_string(),
                ..Default::default()
            }
        }
    }

    struct Api(Arc<NetworkLog>, Service);

    #[async_trait]
    impl MappingApi for Api {
        async fn supported_issuers(&self, endpoint: &str) -> Result<Vec<String>, McError> {
            self.0.push(format!("issuers {}", endpoint));
            Ok(Vec::new())
        }

        async fn audience(&self, endpoint: &str, _token: &str) -> Result<Option<String>, McError> {
            self.0.push(format!("audience {}", endpoint));
            Ok(self.1.audience.clone())
        }

        async fn local_username(&self, endpoint: &str, _token: &str) -> Result<String, McError> {
            self.0.push(format!("username {}", endpoint));
            Ok(self.1.username.clone())
        }

        async fn generate_otp(&self, endpoint: &str, _token: &str) -> Result<OtpStatus, McError> {
            self.0.push(format!("otp {}", endpoint));
            Ok(self.1.otp)
        }
    }

    struct Agent(Option<String>);

    #[async_trait]
    impl TokenAgent for Agent {
        async fn access_token(&self, _request: &AgentRequest) -> Result<String, McError> {
            self.0
                .clone()
                .ok_or_else(|| McError::AgentUnavailable("OIDC_SOCK is not set".to_string()))
        }
    }

    /// Resolver whose services map every token to `username`
    pub fn resolver(
        source: Option<CredentialSource>,
        username: &str,
    ) -> (SessionResolver, Arc<NetworkLog>) {
        resolver_for(source, Service::mapping_to(username))
    }

    /// Resolver backed by `service`
    pub fn resolver_for(
        source: Option<CredentialSource>,
        service: Service,
    ) -> (SessionResolver, Arc<NetworkLog>) {
        let log = Arc::new(NetworkLog::default());
        let agent = Agent(service.agent_token.clone());
        let resolver = SessionResolver::new(
            ResolverSettings::default(),
            source,
            Box::new(Probe(log.clone())),
            Box::new(Api(log.clone(), service)),
            Box::new(agent),
        );
        (resolver, log)
    }

    /// Transport that records invocations and answers with fixed codes
    #[derive(Default)]
    pub struct RecordingTransport {
        pub codes: Mutex<Vec<i32>>,
        pub runs: Mutex<Vec<Invocation>>,
    }

    impl RecordingTransport {
        pub fn exiting_with(codes: &[i32]) -> Self {
            Self {
                codes: Mutex::new(codes.iter().rev().copied().collect()),
                runs: Mutex::new(Vec::new()),
            }
        }

        pub fn runs(&self) -> Vec<Invocation> {
            self.runs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn run(&self, invocation: &Invocation) -> Result<i32, McError> {
            self.runs.lock().unwrap().push(invocation.clone());
            Ok(self.codes.lock().unwrap().pop().unwrap_or(0))
        }
    }
}
