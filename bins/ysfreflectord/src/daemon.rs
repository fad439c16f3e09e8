//! Unix daemonization: detach from the controlling terminal, start a new
//! session, chdir to `/`, and drop root privileges to a fixed service user.

use std::path::Path;

use nix::unistd::{chdir, fork, setgid, setsid, setuid, ForkResult, Uid};
use thiserror::Error;

/// Service account the daemon drops privileges to when started as root,
/// matching the account the upstream reflector documents.
const SERVICE_USER: &str = "mmdvm";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("setsid failed: {0}")]
    Setsid(#[source] nix::Error),
    #[error("chdir failed: {0}")]
    Chdir(#[source] nix::Error),
    #[error("service user {0:?} not found")]
    UnknownUser(&'static str),
    #[error("dropping privileges failed: {0}")]
    DropPrivileges(#[source] nix::Error),
}

/// Fork into the background, detach from the terminal, and (if running as
/// root) drop to [`SERVICE_USER`]. Must be called before the tokio runtime
/// starts: a multi-threaded process must not fork.
pub fn daemonize() -> Result<(), DaemonError> {
    // SAFETY: called before the async runtime spins up any additional
    // threads, so the forked child inherits a single-threaded process.
    match unsafe { fork() }.map_err(DaemonError::Fork)? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(DaemonError::Setsid)?;
    chdir(Path::new("/")).map_err(DaemonError::Chdir)?;

    if Uid::effective().is_root() {
        drop_privileges()?;
    }

    Ok(())
}

fn drop_privileges() -> Result<(), DaemonError> {
    let user = nix::unistd::User::from_name(SERVICE_USER)
        .map_err(DaemonError::DropPrivileges)?
        .ok_or(DaemonError::UnknownUser(SERVICE_USER))?;

    setgid(user.gid).map_err(DaemonError::DropPrivileges)?;
    setuid(user.uid).map_err(DaemonError::DropPrivileges)?;
    Ok(())
}
