//! Credential resolution chain
//!
//! endpoint -> token -> username, once per remote host and invocation.

mod endpoint;
mod session;
mod token;

pub use endpoint::{candidates, resolve_endpoint};
pub use session::{ResolvedSession, ResolverSettings, SessionResolver};
pub use token::{one_time_password, resolve_token, ResolvedToken, MAX_PASSWORD_LEN};
