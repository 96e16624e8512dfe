//! sshpass command lines printed by `--dry-run`

use super::{TransportOptions, DEFAULT_SSH_PORT};

/// Prompt sshpass waits for before sending the password
pub const SSHPASS_PROMPT: &str = "Access Token";

fn sshpass(password: &str) -> String {
    format!("sshpass -P '{}' -p {}", SSHPASS_PROMPT, password)
}

/// `sshpass ... ssh [-p PORT] user@host ['command']`
pub fn ssh_line(
    password: &str,
    options: &TransportOptions,
    username: &str,
    host: &str,
    command: Option<&str>,
) -> String {
    let mut line = format!("{} ssh", sshpass(password));
    if options.port != DEFAULT_SSH_PORT {
        line.push_str(&format!(" -p {}", options.port));
    }
    line.push_str(&format!(" {}@{}", username, host));
    if let Some(command) = command {
        line.push_str(&format!(" '{}'", command));
    }
    line
}

/// `sshpass ... scp [-r] [-p] [-P PORT] operands...`
pub fn scp_line(password: &str, options: &TransportOptions, operands: &[String]) -> String {
    let mut line = format!("{} scp", sshpass(password));
    if options.recursive {
        line.push_str(" -r");
    }
    if options.preserve_times {
        line.push_str(" -p");
    }
    if options.port != DEFAULT_SSH_PORT {
        line.push_str(&format!(" -P {}", options.port));
    }
    for operand in operands {
        line.push(' ');
        line.push_str(operand);
    }
    line
}
