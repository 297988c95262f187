//! Mount namespace isolation.
//!
//! A freshly cloned mount namespace still shares propagation with the host.
//! Marking the whole tree private must precede every other mount, or the
//! container's mounts would show up on the host.

use std::path::Path;

use corral_common::error::{CorralError, Result};
use nix::mount::MsFlags;

use crate::syscall::Syscall;

/// Recursively marks every mount under `/` as private.
///
/// # Errors
///
/// Returns [`CorralError::MountFailed`] if the propagation change fails.
pub fn make_mounts_private(syscall: &dyn Syscall) -> Result<()> {
    let root = Path::new("/");
    syscall
        .mount(None, root, None, MsFlags::MS_REC | MsFlags::MS_PRIVATE, None)
        .map_err(|e| CorralError::MountFailed {
            target: root.to_path_buf(),
            fstype: "propagation".into(),
            source: e,
        })?;
    tracing::debug!("mount tree marked private");
    Ok(())
}
