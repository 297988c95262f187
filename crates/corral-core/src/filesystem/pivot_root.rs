//! Root filesystem switch via `pivot_root(2)`.
//!
//! More thorough than `chroot`: the old root is detached entirely, so the
//! host filesystem is unreachable from the container afterwards.

use std::path::Path;

use corral_common::constants::OLD_ROOT_DIR_NAME;
use corral_common::error::{CorralError, Result};
use nix::mount::MntFlags;

use crate::syscall::Syscall;

/// Makes `new_root` the process root and detaches the old one.
///
/// `new_root` is bind-mounted onto itself first, since `pivot_root(2)`
/// requires a mount point. The old root is lazily unmounted because it may
/// still be busy, then its directory is removed.
///
/// # Errors
///
/// Returns [`CorralError::PivotFailed`] naming the step that failed.
pub fn pivot_root(new_root: &Path, syscall: &dyn Syscall) -> Result<()> {
    super::mount::bind_mount(new_root, new_root, true, syscall).map_err(|e| match e {
        CorralError::MountFailed { source, .. } => pivot_error("bind mount self", source),
        other => other,
    })?;

    let put_old = new_root.join(OLD_ROOT_DIR_NAME);
    super::create_dir_all(&put_old, 0o700).map_err(|e| match e {
        CorralError::Io { source, .. } => pivot_error("mkdir old_root", source),
        other => other,
    })?;

    syscall
        .pivot_root(new_root, &put_old)
        .map_err(|e| pivot_error("pivot_root", e))?;
    syscall
        .chdir(Path::new("/"))
        .map_err(|e| pivot_error("chdir", e))?;

    let old_root = Path::new("/").join(OLD_ROOT_DIR_NAME);
    syscall
        .umount2(&old_root, MntFlags::MNT_DETACH)
        .map_err(|e| pivot_error("unmount old_root", e))?;
    syscall
        .remove_dir(&old_root)
        .map_err(|e| pivot_error("rmdir old_root", e))?;

    tracing::info!(new_root = %new_root.display(), "root pivoted");
    Ok(())
}

fn pivot_error(step: &'static str, source: std::io::Error) -> CorralError {
    CorralError::PivotFailed { step, source }
}
