//! Askpass helper mode
//!
//! ssh runs `$SSH_ASKPASS "<prompt>"` and reads the answer from stdout.
//! When started with [`ASKPASS_PASSWORD_ENV`] set, `mccli` answers that
//! prompt instead of parsing a command line.

use std::io::Write;
use std::process::ExitCode;

use crate::output::print_warning;

pub const SSH_ASKPASS_ENV: &str = "SSH_ASKPASS";
pub const SSH_ASKPASS_REQUIRE_ENV: &str = "SSH_ASKPASS_REQUIRE";

/// Carries the password from the parent `mccli` to the askpass child
pub const ASKPASS_PASSWORD_ENV: &str = "MCCLI_ASKPASS_PASSWORD";

/// What to answer for a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send the access token (or one-time password)
    Password,
    /// Accept an unknown host key
    AcceptHostKey,
    /// Decline, so ssh moves on to the next method
    Decline,
}

/// Classify an ssh prompt
pub fn classify(prompt: &str) -> Reply {
    let prompt = prompt.to_lowercase();
    if prompt.contains("are you sure you want to continue connecting") {
        Reply::AcceptHostKey
    } else if prompt.contains("passphrase for key") {
        Reply::Decline
    } else {
        Reply::Password
    }
}

/// Answer the prompt if this process was started as askpass helper.
///
/// Returns `None` for a normal invocation. ssh passes the prompt as the
/// only argument.
pub fn run_if_requested() -> Option<ExitCode> {
    if std::env::args_os().count() > 2 {
        return None;
    }
    let password = std::env::var(ASKPASS_PASSWORD_ENV).ok()?;
    let prompt = std::env::args_os()
        .nth(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_default();

    let answer = match classify(&prompt) {
        Reply::Password => password,
        Reply::AcceptHostKey => {
            print_warning("Accepting unknown host key on first connection");
            "yes".to_string()
        }
        Reply::Decline => return Some(ExitCode::FAILURE),
    };

    let mut stdout = std::io::stdout();
    match writeln!(stdout, "{}", answer).and_then(|_| stdout.flush()) {
        Ok(()) => Some(ExitCode::SUCCESS),
        Err(_) => Some(ExitCode::FAILURE),
    }
}
