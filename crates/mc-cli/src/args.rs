//! Command-line arguments shared by the subcommands

use clap::Args;

use mc_core::CredentialFlags;

/// motley_cue and access token options
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// motley_cue API endpoint, default URLs: https://HOSTNAME, https://HOSTNAME:8443, http://HOSTNAME:8080
    #[arg(long, value_name = "URL", global = true)]
    pub mc_endpoint: Option<String>,

    /// Ignore verifying the SSL certificate for motley_cue endpoint, NOT RECOMMENDED
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Pass token directly [env: ACCESS_TOKEN, OIDC, OS_ACCESS_TOKEN, OIDC_ACCESS_TOKEN, WATTS_TOKEN, WATTSON_TOKEN]
    #[arg(long, value_name = "TOKEN", global = true, help_heading = "Access Token sources")]
    pub token: Option<String>,

    /// Name of configured account in oidc-agent [env: OIDC_AGENT_ACCOUNT]
    #[arg(long, value_name = "NAME", global = true, help_heading = "Access Token sources")]
    pub oa_account: Option<String>,

    /// URL of issuer, configured account in oidc-agent for this issuer will be used [env: OIDC_ISS, OIDC_ISSUER]
    #[arg(
        long = "iss",
        alias = "issuer",
        value_name = "URL",
        global = true,
        help_heading = "Access Token sources"
    )]
    pub issuer: Option<String>,
}

impl CommonArgs {
    pub fn credential_flags(&self) -> CredentialFlags {
        CredentialFlags {
            token: self.token.clone(),
            oa_account: self.oa_account.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

/// Arguments of `mccli ssh`
#[derive(Args, Debug, Clone)]
pub struct SshArgs {
    /// Print sshpass command and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Port to connect to on remote host
    #[arg(short = 'p', value_name = "PORT", help_heading = "ssh options")]
    pub port: Option<u16>,

    /// Remote host, optionally as user@host
    pub hostname: String,

    /// Command to execute instead of a login shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl SshArgs {
    /// Remote command, if any
    pub fn remote_command(&self) -> Option<String> {
        if self.command.is_empty() {
            None
        } else {
            Some(self.command.join(" "))
        }
    }
}

/// Arguments of `mccli scp`
#[derive(Args, Debug, Clone)]
pub struct ScpArgs {
    /// Print sshpass command and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Port to connect to on remote host
    #[arg(short = 'P', value_name = "PORT", help_heading = "scp options")]
    pub port: Option<u16>,

    /// Recursively copy entire directories
    #[arg(short = 'r', help_heading = "scp options")]
    pub recursive: bool,

    /// Preserve modification times and access times from the original file
    #[arg(short = 'p', help_heading = "scp options")]
    pub preserve_times: bool,

    /// Files to copy, [user@]host:path or local paths
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Destination, [user@]host:path or a local path
    #[arg(value_name = "TARGET")]
    pub target: String,
}
