//! SFTP command

/// SFTP is not supported
pub fn sftp_command() {
    println!("Not implemented.");
}
