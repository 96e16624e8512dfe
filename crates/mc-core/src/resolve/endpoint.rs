//! motley_cue endpoint discovery

use crate::api::{EndpointProbe, ProbeOutcome};
use crate::error::McError;

/// Candidate URLs for a host, in the order they are tried
pub fn candidates(host: &str) -> [String; 3] {
    [
        format!("https://{}", host),
        format!("https://{}:8443", host),
        format!("http://{}:8080", host),
    ]
}

/// Resolve the motley_cue base URL for `host`.
///
/// An explicit endpoint wins and is not probed. Otherwise HTTPS candidates
/// are tried before plain HTTP, stopping at the first that answers.
pub async fn resolve_endpoint(
    probe: &dyn EndpointProbe,
    explicit: Option<&str>,
    host: &str,
) -> Result<String, McError> {
    if let Some(endpoint) = explicit {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint).map_err(|e| {
            McError::InvalidOperand(format!("--mc-endpoint {}: {}", endpoint, e))
        })?;
        tracing::debug!("Using motley_cue endpoint {}", endpoint);
        return Ok(endpoint);
    }

    tracing::info!("Looking for motley_cue service on host '{}'", host);

    for candidate in candidates(host) {
        match probe.probe(&candidate).await {
            ProbeOutcome::Found => {
                if candidate.starts_with("http://") {
                    tracing::warn!("using unencrypted motley_cue endpoint: {}", candidate);
                } else {
                    tracing::info!("Found motley_cue service at {}", candidate);
                }
                return Ok(candidate);
            }
            ProbeOutcome::TlsFailure => {
                tracing::warn!(
                    "SSL certificate verification failed for {}. \
                     Use --insecure if you wish to ignore SSL certificate verification",
                    candidate
                );
            }
            ProbeOutcome::Missing => {}
        }
    }

    Err(McError::EndpointUnreachable {
        host: host.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Probe that answers from a fixed table and records every URL it sees
    #[derive(Default)]
    pub(crate) struct RecordingProbe {
        pub answers: HashMap<String, ProbeOutcome>,
        pub seen: Mutex<Vec<String>>,
    }

    impl RecordingProbe {
        pub fn answering(pairs: &[(&str, ProbeOutcome)]) -> Self {
            Self {
                answers: pairs.iter().map(|(u, o)| (u.to_string(), *o)).collect(),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EndpointProbe for RecordingProbe {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            self.seen.lock().unwrap().push(url.to_string());
            self.answers.get(url).copied().unwrap_or(ProbeOutcome::Missing)
        }
    }

    #[tokio::test]
    async fn test_https_first_and_http_never_when_https_works() {
        let probe = RecordingProbe::answering(&[
            ("https://host", ProbeOutcome::Found),
            ("http://host:8080", ProbeOutcome::Found),
        ]);
        let endpoint = resolve_endpoint(&probe, None, "host").await.unwrap();
        assert_eq!(endpoint, "https://host");
        assert_eq!(probe.seen(), vec!["https://host"]);
    }

    #[tokio::test]
    async fn test_falls_back_through_8443_to_http() {
        let probe = RecordingProbe::answering(&[
            ("https://host", ProbeOutcome::TlsFailure),
            ("http://host:8080", ProbeOutcome::Found),
        ]);
        let endpoint = resolve_endpoint(&probe, None, "host").await.unwrap();
        assert_eq!(endpoint, "http://host:8080");
        assert_eq!(
            probe.seen(),
            vec!["https://host", "https://host:8443", "http://host:8080"]
        );
    }

    #[tokio::test]
    async fn test_unreachable() {
        let probe = RecordingProbe::default();
        let err = resolve_endpoint(&probe, None, "nowhere").await.unwrap_err();
        assert!(matches!(err, McError::EndpointUnreachable { host } if host == "nowhere"));
        assert_eq!(probe.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_explicit_endpoint_is_not_probed() {
        let probe = RecordingProbe::default();
        let endpoint = resolve_endpoint(&probe, Some("https://mc.example.org/"), "host")
            .await
            .unwrap();
        assert_eq!(endpoint, "https://mc.example.org");
        assert!(probe.seen().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_endpoint_must_be_url() {
        let probe = RecordingProbe::default();
        assert!(resolve_endpoint(&probe, Some("not a url"), "host").await.is_err());
    }
}
