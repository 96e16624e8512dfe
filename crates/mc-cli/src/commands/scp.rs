//! SCP command implementation

use anyhow::Result;
use std::io::ErrorKind;
use std::path::Path;

use mc_core::{McError, Operand, ResolvedSession, SessionResolver};

use crate::args::ScpArgs;
use crate::transport::{dry_run, Invocation, Transport, TransportOptions};

use super::{dry_run_password, session_for_dry_run};

/// Which side of the copy is remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// Local sources, remote target
    Upload,
    /// Remote sources, local target
    Download,
}

/// Parsed and validated scp operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub sources: Vec<Operand>,
    pub target: Operand,
    pub direction: CopyDirection,
}

/// Parse every operand and work out the copy direction.
///
/// Runs before anything touches the network or the filesystem.
pub fn plan_copy(sources: &[String], target: &str) -> Result<CopyPlan, McError> {
    let target: Operand = target.parse()?;
    let sources = sources
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<Operand>, _>>()?;

    let direction = if target.is_remote() {
        if sources.iter().any(Operand::is_remote) {
            return Err(McError::UnsupportedCopyDirection(
                "scp between remote hosts not yet supported.".to_string(),
            ));
        }
        CopyDirection::Upload
    } else {
        if sources.iter().any(|s| !s.is_remote()) {
            return Err(McError::UnsupportedCopyDirection(
                "No remote host specified. Use regular cp instead.".to_string(),
            ));
        }
        CopyDirection::Download
    };

    Ok(CopyPlan {
        sources,
        target,
        direction,
    })
}

/// Check that a local source can be sent
pub async fn check_local_source(path: &Path, recursive: bool) -> Result<(), McError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| fs_error(path, e))?;

    if metadata.is_dir() {
        if !recursive {
            return Err(McError::IsADirectory(path.to_path_buf()));
        }
        tokio::fs::read_dir(path)
            .await
            .map_err(|e| fs_error(path, e))?;
    } else {
        tokio::fs::File::open(path)
            .await
            .map_err(|e| fs_error(path, e))?;
    }
    Ok(())
}

fn fs_error(path: &Path, err: std::io::Error) -> McError {
    match err.kind() {
        ErrorKind::NotFound => McError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => McError::PermissionDenied(path.to_path_buf()),
        _ => McError::Io(err),
    }
}

/// Execute the scp command.
///
/// Sources are copied one at a time; the first non-zero exit code stops
/// the remaining transfers and is returned.
pub async fn scp_command(
    args: &ScpArgs,
    port: u16,
    resolver: &mut SessionResolver,
    transport: &dyn Transport,
) -> Result<i32> {
    let plan = plan_copy(&args.sources, &args.target)?;
    let options = TransportOptions {
        port,
        recursive: args.recursive,
        preserve_times: args.preserve_times,
        dry_run: args.dry_run,
    };

    if options.dry_run {
        println!("{}", scp_dry_run(&plan, &options, resolver).await?);
        return Ok(0);
    }

    match plan.direction {
        CopyDirection::Upload => upload(&plan, &options, resolver, transport).await,
        CopyDirection::Download => download(&plan, &options, resolver, transport).await,
    }
}

async fn upload(
    plan: &CopyPlan,
    options: &TransportOptions,
    resolver: &mut SessionResolver,
    transport: &dyn Transport,
) -> Result<i32> {
    for source in &plan.sources {
        check_local_source(Path::new(&source.path), options.recursive).await?;
    }

    let session = remote_session(resolver, &plan.target).await?;
    let target = plan.target.render_with_user(&session.username);

    for source in &plan.sources {
        tracing::info!("Copying {} to {}", source.path, target);
        let invocation =
            Invocation::scp(options, source.path.clone(), target.clone(), &session.password);
        let code = transport.run(&invocation).await?;
        if code != 0 {
            return Ok(code);
        }
    }
    Ok(0)
}

async fn download(
    plan: &CopyPlan,
    options: &TransportOptions,
    resolver: &mut SessionResolver,
    transport: &dyn Transport,
) -> Result<i32> {
    for source in &plan.sources {
        let session = remote_session(resolver, source).await?;
        let remote = source.render_with_user(&session.username);
        tracing::info!("Copying {} to {}", remote, plan.target.path);
        let invocation =
            Invocation::scp(options, remote, plan.target.path.clone(), &session.password);
        let code = transport.run(&invocation).await?;
        if code != 0 {
            return Ok(code);
        }
    }
    Ok(0)
}

async fn remote_session(
    resolver: &mut SessionResolver,
    operand: &Operand,
) -> Result<ResolvedSession, McError> {
    let host = operand.host.as_deref().unwrap_or_default();
    resolver.session(host, operand.user.as_deref()).await
}

/// The sshpass line equivalent to this copy
async fn scp_dry_run(
    plan: &CopyPlan,
    options: &TransportOptions,
    resolver: &mut SessionResolver,
) -> Result<String> {
    let mut first_session: Option<ResolvedSession> = None;
    let mut operands = Vec::with_capacity(plan.sources.len() + 1);

    for operand in plan.sources.iter().chain(std::iter::once(&plan.target)) {
        let Some(host) = &operand.host else {
            operands.push(operand.path.clone());
            continue;
        };
        let user = match session_for_dry_run(resolver, host, operand.user.as_deref()).await? {
            Some(session) => {
                let username = session.username.clone();
                first_session.get_or_insert(session);
                username
            }
            None => operand.user.clone().unwrap_or_default(),
        };
        operands.push(operand.render_with_user(&user));
    }

    let password = dry_run_password(resolver.source(), first_session.as_ref());
    Ok(dry_run::scp_line(&password, options, &operands))
}
