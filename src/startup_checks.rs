//! Startup requirement validation for herakles-process-info.
//!
//! Checks that the procfs mount is usable and warns when the service lacks
//! the privileges to resolve executables of other users' processes.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_mount(proc_root)?;
    check_exe_access(proc_root)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - executables of other users' processes will read as Unknown");
        warn!("   Recommendation: Run as root or grant cap_sys_ptrace");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that the proc root looks like a procfs mount
fn check_proc_mount(proc_root: &Path) -> Result<(), ValidationError> {
    if !proc_root.is_dir() {
        error!("❌ {} is not a directory", proc_root.display());
        return Err(ValidationError::ProcRootMissing(proc_root.display().to_string()));
    }

    let self_stat = proc_root.join("self").join("stat");
    match fs::metadata(&self_stat) {
        Ok(_) => {
            debug!("Found {}", self_stat.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ {} is not readable: {}", self_stat.display(), e);
            error!("   Is procfs mounted at {}?", proc_root.display());
            Err(ValidationError::NotProcfs(proc_root.display().to_string()))
        }
    }
}

/// Check executable link access for init
fn check_exe_access(proc_root: &Path) -> Result<(), ValidationError> {
    let test_link = proc_root.join("1").join("exe");

    match fs::read_link(&test_link) {
        Ok(_) => {
            info!("✅ {} access: Can resolve all executables", proc_root.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", test_link.display());
            error!("   Executables of processes owned by other users will read as Unknown");
            error!("");
            error!("   Solutions:");
            error!("   1. Run as root");
            error!("   2. Grant capabilities:");
            error!("      setcap cap_sys_ptrace+ep /path/to/binary");
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            warn!("⚠️  Could not test {}: {}", test_link.display(), e);
            Ok(())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("proc root not found: {0}")]
    ProcRootMissing(String),

    #[error("not a procfs mount: {0}")]
    NotProcfs(String),
}
