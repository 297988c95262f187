//! `OverlayFS` assembly of the container root.
//!
//! The extracted image is the single read-only lower layer. The container
//! root directory is both the writable upper layer and the mount point, so
//! every write made by the container lands in its own directory.

use std::path::{Path, PathBuf};

use corral_common::error::{CorralError, Result};
use corral_common::paths::ContainerPaths;
use nix::mount::MsFlags;

use crate::syscall::Syscall;

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layer.
    pub lower_dir: PathBuf,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Returns the overlay layout of a container.
    #[must_use]
    pub fn for_container(paths: &ContainerPaths) -> Self {
        Self {
            lower_dir: paths.image_extracted(),
            upper_dir: paths.container_root(),
            work_dir: paths.container_workdir(),
            merged_dir: paths.container_root(),
        }
    }

    /// Returns the `mount(2)` data string for this overlay.
    #[must_use]
    pub fn mount_data(&self) -> String {
        format!(
            "lowerdir={},upperdir={},workdir={}",
            self.lower_dir.display(),
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the upper, work and merged directories if they do not exist,
/// then issues the mount with overlay-specific options.
///
/// # Errors
///
/// Returns [`CorralError::Io`] if directory creation fails or
/// [`CorralError::MountFailed`] if the mount fails.
pub fn mount_overlay(config: &OverlayConfig, syscall: &dyn Syscall) -> Result<()> {
    for dir in [&config.upper_dir, &config.work_dir, &config.merged_dir] {
        super::create_dir_all(dir, 0o755)?;
    }

    let opts = config.mount_data();
    syscall
        .mount(
            Some(Path::new("overlay")),
            &config.merged_dir,
            Some("overlay"),
            MsFlags::MS_NODEV,
            Some(opts.as_str()),
        )
        .map_err(|e| CorralError::MountFailed {
            target: config.merged_dir.clone(),
            fstype: "overlay".into(),
            source: e,
        })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use corral_common::types::ContainerId;

    use super::*;
    use crate::syscall::test::{CallKind, TestSyscall};

    fn paths(base: &Path) -> ContainerPaths {
        ContainerPaths::new(
            &base.join("containers"),
            &base.join("images"),
            "alpine",
            &ContainerId::new("c1"),
        )
    }

    #[test]
    fn overlay_uses_image_as_lower_and_root_as_upper() {
        let base = tempfile::tempdir().unwrap();
        let paths = paths(base.path());
        let config = OverlayConfig::for_container(&paths);
        let syscall = TestSyscall::default();

        mount_overlay(&config, &syscall).unwrap();

        assert!(paths.container_root().is_dir());
        assert!(paths.container_workdir().is_dir());
        let mounts = syscall.mounts();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].target, paths.container_root());
        assert_eq!(mounts[0].fstype.as_deref(), Some("overlay"));
        assert_eq!(mounts[0].flags, MsFlags::MS_NODEV);
        assert_eq!(
            mounts[0].data.as_deref(),
            Some(
                format!(
                    "lowerdir={},upperdir={},workdir={}",
                    paths.image_extracted().display(),
                    paths.container_root().display(),
                    paths.container_workdir().display()
                )
                .as_str()
            )
        );
    }

    #[test]
    fn failed_overlay_mount_is_a_mount_failure() {
        let base = tempfile::tempdir().unwrap();
        let config = OverlayConfig::for_container(&paths(base.path()));
        let err = mount_overlay(&config, &TestSyscall::failing_on(CallKind::Mount)).unwrap_err();
        assert!(matches!(err, CorralError::MountFailed { ref fstype, .. } if fstype == "overlay"));
    }
}
