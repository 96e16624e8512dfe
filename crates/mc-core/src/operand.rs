//! SCP operands and SSH destinations
//!
//! Operands follow scp's rules: `[user@]host:path` is remote, anything
//! else is local. A colon that only appears after a `/` belongs to a local
//! path, so `./a:b` and `/tmp/x:y` stay local.

use std::fmt;
use std::str::FromStr;

use crate::error::McError;

/// A parsed scp source or target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// Explicit remote user, if given
    pub user: Option<String>,
    /// Remote host; `None` for a local path
    pub host: Option<String>,
    /// Path on the host (or locally)
    pub path: String,
}

impl Operand {
    /// Local path operand
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            user: None,
            host: None,
            path: path.into(),
        }
    }

    /// Whether the operand names a remote host
    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }

    /// Render the operand for a command line, substituting `username` for
    /// the remote user.
    pub fn render_with_user(&self, username: &str) -> String {
        match &self.host {
            Some(host) => format!("{}@{}:{}", username, host, self.path),
            None => self.path.clone(),
        }
    }
}

impl FromStr for Operand {
    type Err = McError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some(colon) = value.find(':') else {
            return Ok(Operand::local(value));
        };

        let prefix = &value[..colon];
        if prefix.is_empty() || prefix.contains('/') {
            return Ok(Operand::local(value));
        }

        let (user, host) = split_user(prefix)?;
        let path = match &value[colon + 1..] {
            "" => ".".to_string(),
            p => p.to_string(),
        };

        Ok(Operand {
            user,
            host: Some(host),
            path,
        })
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user, &self.host) {
            (Some(user), Some(host)) => write!(f, "{}@{}:{}", user, host, self.path),
            (None, Some(host)) => write!(f, "{}:{}", host, self.path),
            _ => f.write_str(&self.path),
        }
    }
}

/// An ssh destination: `[user@]hostname`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub user: Option<String>,
    pub host: String,
}

impl FromStr for Destination {
    type Err = McError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (user, host) = split_user(value)?;
        Ok(Destination { user, host })
    }
}

fn split_user(value: &str) -> Result<(Option<String>, String), McError> {
    let (user, host) = match value.rsplit_once('@') {
        Some((user, host)) => {
            if user.is_empty() {
                return Err(McError::InvalidOperand(format!(
                    "{}: empty user name",
                    value
                )));
            }
            (Some(user.to_string()), host)
        }
        None => (None, value),
    };

    if !is_valid_hostname(host) {
        return Err(McError::InvalidOperand(format!(
            "{}: invalid remote hostname '{}'",
            value, host
        )));
    }

    Ok((user, host.to_string()))
}

/// Dot-separated labels of word characters; hyphens only inside a label.
pub fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        })
}
