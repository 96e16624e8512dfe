//! SSH command implementation

use anyhow::Result;

use mc_core::{Destination, SessionResolver};

use crate::args::SshArgs;
use crate::transport::{dry_run, Invocation, Transport, TransportOptions};

use super::{dry_run_password, session_for_dry_run};

/// Execute the ssh command, returning the remote exit code
pub async fn ssh_command(
    args: &SshArgs,
    port: u16,
    resolver: &mut SessionResolver,
    transport: &dyn Transport,
) -> Result<i32> {
    let destination: Destination = args.hostname.parse()?;
    let command = args.remote_command();
    let options = TransportOptions {
        port,
        dry_run: args.dry_run,
        ..Default::default()
    };

    if options.dry_run {
        println!(
            "{}",
            ssh_dry_run(&destination, command.as_deref(), &options, resolver).await?
        );
        return Ok(0);
    }

    let session = resolver
        .session(&destination.host, destination.user.as_deref())
        .await?;
    let invocation = Invocation::ssh(
        &options,
        &session.username,
        &destination.host,
        command.as_deref(),
        &session.password,
    );
    Ok(transport.run(&invocation).await?)
}

/// The sshpass line equivalent to this ssh invocation
async fn ssh_dry_run(
    destination: &Destination,
    command: Option<&str>,
    options: &TransportOptions,
    resolver: &mut SessionResolver,
) -> Result<String> {
    let session =
        session_for_dry_run(resolver, &destination.host, destination.user.as_deref()).await?;
    let username = match &session {
        Some(session) => session.username.clone(),
        None => destination.user.clone().unwrap_or_default(),
    };
    let password = dry_run_password(resolver.source(), session.as_ref());
    Ok(dry_run::ssh_line(
        &password,
        options,
        &username,
        &destination.host,
        command,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{resolver, resolver_for, RecordingTransport, Service};
    use mc_core::api::OtpStatus;
    use mc_core::CredentialSource;

    fn args(hostname: &str, command: &[&str], dry_run: bool) -> SshArgs {
        SshArgs {
            dry_run,
            port: None,
            hostname: hostname.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_ssh_runs_with_mapped_user() {
        let (mut r, _log) = resolver(Some(CredentialSource::Token("tok".into())), "alice");
        let transport = RecordingTransport::exiting_with(&[3]);

        let code = ssh_command(&args("host", &["uptime"], false), 22, &mut r, &transport)
            .await
            .unwrap();

        assert_eq!(code, 3);
        let runs = transport.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].args, vec!["-p", "22", "alice@host", "uptime"]);
        assert_eq!(runs[0].password, "tok");
    }

    #[tokio::test]
    async fn test_dry_run_with_user_makes_no_network_call() {
        let (mut r, log) = resolver(Some(CredentialSource::AgentAccount("egi".into())), "x");
        let destination: Destination = "bob@host".parse().unwrap();
        let line = ssh_dry_run(&destination, None, &TransportOptions::default(), &mut r)
            .await
            .unwrap();

        assert_eq!(line, "sshpass -P 'Access Token' -p `oidc-token egi` ssh bob@host");
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_without_user_resolves_username() {
        let (mut r, log) = resolver(Some(CredentialSource::Token("tok".into())), "alice");
        let destination: Destination = "host".parse().unwrap();
        let options = TransportOptions {
            port: 2222,
            dry_run: true,
            ..Default::default()
        };
        let line = ssh_dry_run(&destination, Some("ls"), &options, &mut r)
            .await
            .unwrap();

        assert_eq!(
            line,
            "sshpass -P 'Access Token' -p 'tok' ssh -p 2222 alice@host 'ls'"
        );
        assert_eq!(log.calls(), vec!["probe https://host", "username https://host"]);
    }

    #[tokio::test]
    async fn test_dry_run_keeps_service_audience() {
        let service = Service {
            audience: Some("ssh-host".to_string()),
            agent_token: Some("agent-token".to_string()),
            ..Service::mapping_to("alice")
        };
        let (mut r, _log) = resolver_for(Some(CredentialSource::AgentAccount("egi".into())), service);
        let destination: Destination = "host".parse().unwrap();
        let line = ssh_dry_run(&destination, None, &TransportOptions::default(), &mut r)
            .await
            .unwrap();

        assert_eq!(
            line,
            "sshpass -P 'Access Token' -p `oidc-token --aud ssh-host egi` ssh alice@host"
        );
    }

    #[tokio::test]
    async fn test_dry_run_long_token_prints_one_time_password() {
        let long = "x".repeat(1500);
        let service = Service {
            otp: OtpStatus {
                supported: true,
                successful: true,
            },
            ..Service::mapping_to("alice")
        };
        let (mut r, log) = resolver_for(Some(CredentialSource::Token(long.clone())), service);
        let destination: Destination = "host".parse().unwrap();
        let line = ssh_dry_run(&destination, None, &TransportOptions::default(), &mut r)
            .await
            .unwrap();

        let otp = mc_core::resolve::one_time_password(&long);
        assert_eq!(
            line,
            format!("sshpass -P 'Access Token' -p {} ssh alice@host", otp)
        );
        assert!(!line.contains(&long));
        assert!(log.calls().contains(&"otp https://host".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_hostname() {
        let (mut r, log) = resolver(Some(CredentialSource::Token("tok".into())), "alice");
        let transport = RecordingTransport::default();
        let err = ssh_command(&args("bad host", &[], false), 22, &mut r, &transport)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<mc_core::McError>().is_some());
        assert!(log.calls().is_empty());
        assert!(transport.runs().is_empty());
    }
}
