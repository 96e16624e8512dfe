//! Access token sources
//!
//! A token comes from exactly one of three places: the token itself, an
//! oidc-agent account, or an issuer URL that oidc-agent maps to an account.
//! Flags are checked for conflicts first, then the environment is consulted
//! in a fixed order, then the config file.

use crate::config::McConfig;
use crate::error::McError;

/// Environment variables holding a token, checked in this order
pub const TOKEN_ENV_VARS: &[&str] = &[
    "ACCESS_TOKEN",
    "OIDC",
    "OS_ACCESS_TOKEN",
    "OIDC_ACCESS_TOKEN",
    "WATTS_TOKEN",
    "WATTSON_TOKEN",
];

/// Environment variables naming an oidc-agent account
pub const ACCOUNT_ENV_VARS: &[&str] = &["OIDC_AGENT_ACCOUNT"];

/// Environment variables holding an issuer URL
pub const ISSUER_ENV_VARS: &[&str] = &["OIDC_ISS", "OIDC_ISSUER"];

/// Where the access token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Token given directly
    Token(String),
    /// oidc-agent account short name
    AgentAccount(String),
    /// Issuer URL, resolved to an account by oidc-agent
    Issuer(String),
}

impl CredentialSource {
    /// Shell fragment that produces the password, as used in dry-run output
    pub fn token_command(&self) -> String {
        match self {
            CredentialSource::Token(token) => format!("'{}'", token),
            CredentialSource::AgentAccount(account) => format!("`oidc-token {}`", account),
            CredentialSource::Issuer(issuer) => format!("`oidc-token {}`", issuer),
        }
    }

    /// Short description for log messages
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Token(_) => "provided access token".to_string(),
            CredentialSource::AgentAccount(account) => format!("oidc-agent account '{}'", account),
            CredentialSource::Issuer(issuer) => format!("issuer '{}'", issuer),
        }
    }
}

/// Raw credential flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct CredentialFlags {
    pub token: Option<String>,
    pub oa_account: Option<String>,
    pub issuer: Option<String>,
}

impl CredentialFlags {
    /// Pick the active source.
    ///
    /// More than one flag is a usage error, reported before anything talks
    /// to the network. Without flags the environment is searched (token,
    /// then account, then issuer) and finally the config defaults.
    pub fn select<F>(
        &self,
        env: F,
        config: &McConfig,
    ) -> Result<Option<CredentialSource>, McError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let given: Vec<&str> = [
            (self.token.is_some(), "--token"),
            (self.oa_account.is_some(), "--oa-account"),
            (self.issuer.is_some(), "--iss"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();

        if given.len() > 1 {
            return Err(McError::ConflictingSources(given.join(", ")));
        }

        if let Some(token) = &self.token {
            return Ok(Some(CredentialSource::Token(token.clone())));
        }
        if let Some(account) = &self.oa_account {
            return Ok(Some(CredentialSource::AgentAccount(account.clone())));
        }
        if let Some(issuer) = &self.issuer {
            return Ok(Some(CredentialSource::Issuer(issuer.clone())));
        }

        Ok(source_from_env(&env).or_else(|| source_from_config(config)))
    }
}

/// First non-empty value among `keys`
pub fn first_env<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| env(key))
        .find(|value| !value.is_empty())
}

fn source_from_env<F>(env: &F) -> Option<CredentialSource>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = first_env(env, TOKEN_ENV_VARS) {
        return Some(CredentialSource::Token(token));
    }
    if let Some(account) = first_env(env, ACCOUNT_ENV_VARS) {
        return Some(CredentialSource::AgentAccount(account));
    }
    first_env(env, ISSUER_ENV_VARS).map(CredentialSource::Issuer)
}

fn source_from_config(config: &McConfig) -> Option<CredentialSource> {
    if let Some(account) = &config.oa_account {
        return Some(CredentialSource::AgentAccount(account.clone()));
    }
    config.issuer.clone().map(CredentialSource::Issuer)
}

/// Reads the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Prefix `https://` when the issuer has no scheme
pub fn normalize_issuer(issuer: &str) -> String {
    if issuer.starts_with("http://") || issuer.starts_with("https://") {
        issuer.to_string()
    } else {
        let normalized = format!("https://{}", issuer);
        tracing::warn!(
            "The issuer URL you provided does not contain protocol information, assuming HTTPS: {}",
            normalized
        );
        normalized
    }
}

/// Issuer URL without scheme, `www.` prefix or trailing slash, lowercased
pub fn canonical_url(url: &str) -> String {
    let url = url.to_lowercase();
    let url = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(&url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Suggested `oidc-gen` invocation for creating an account for `issuer`
pub fn oidc_gen_command(issuer: &str) -> String {
    let known = match canonical_url(issuer).as_str() {
        "aai.egi.eu/oidc" => Some(
            "oidc-gen --pub --iss https://aai.egi.eu/oidc --scope \"openid profile email offline_access eduperson_entitlement eduperson_scoped_affiliation eduperson_unique_id\" egi",
        ),
        "wlcg.cloud.cnaf.infn.it" => Some(
            "oidc-gen --pub --issuer https://wlcg.cloud.cnaf.infn.it --scope \"openid profile offline_access eduperson_entitlement eduperson_scoped_affiliation wlcg.groups wlcg\" wlcg",
        ),
        "login.helmholtz.de/oauth2" => Some(
            "oidc-gen --pub --iss https://login.helmholtz.de/oauth2 --scope \"openid profile email offline_access eduperson_entitlement eduperson_scoped_affiliation eduperson_unique_id\" helmholtz",
        ),
        "accounts.google.com" => Some(
            "oidc-gen --pub --iss https://accounts.google.com/ --flow device --scope max google",
        ),
        _ => None,
    };

    known
        .map(str::to_string)
        .unwrap_or_else(|| format!("oidc-gen --iss {}", issuer))
}
