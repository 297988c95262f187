//! Special filesystems mounted inside the container root.
//!
//! Order is significant: `/dev` must be a tmpfs before device nodes are
//! created in it, and `/dev/pts` must exist before the console is bound to
//! a pty inside it.

use std::path::{Path, PathBuf};

use corral_common::error::{CorralError, Result};
use nix::mount::MsFlags;

use crate::syscall::Syscall;

/// One entry of a [`MountPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    /// Mount source.
    pub source: &'static str,
    /// Mount point.
    pub target: PathBuf,
    /// Filesystem type.
    pub fstype: &'static str,
    /// Mount flags.
    pub flags: MsFlags,
    /// Filesystem-specific data.
    pub data: Option<&'static str>,
}

/// Ordered list of mounts applied one after the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    mounts: Vec<MountSpec>,
}

impl MountPlan {
    /// Returns the special filesystems of a container rooted at `root`.
    #[must_use]
    pub fn special_filesystems(root: &Path) -> Self {
        let spec = |source, target: &str, fstype, flags, data| MountSpec {
            source,
            target: root.join(target),
            fstype,
            flags,
            data,
        };
        let locked = MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC;
        Self {
            mounts: vec![
                spec("proc", "proc", "proc", locked, None),
                spec("sysfs", "sys", "sysfs", locked, None),
                spec("tmpfs", "dev", "tmpfs", MsFlags::MS_NOSUID, Some("mode=0755")),
                spec(
                    "devpts",
                    "dev/pts",
                    "devpts",
                    MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC,
                    None,
                ),
                spec(
                    "tmpfs",
                    "dev/shm",
                    "tmpfs",
                    MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
                    None,
                ),
            ],
        }
    }

    /// Returns the mounts in application order.
    #[must_use]
    pub fn mounts(&self) -> &[MountSpec] {
        &self.mounts
    }

    /// Applies every mount in order, creating each target on demand.
    ///
    /// Stops at the first failure; earlier mounts stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::Io`] if a target cannot be created or
    /// [`CorralError::MountFailed`] if a mount fails.
    pub fn apply(&self, syscall: &dyn Syscall) -> Result<()> {
        for spec in &self.mounts {
            super::create_dir_all(&spec.target, 0o755)?;
            syscall
                .mount(
                    Some(Path::new(spec.source)),
                    &spec.target,
                    Some(spec.fstype),
                    spec.flags,
                    spec.data,
                )
                .map_err(|e| CorralError::MountFailed {
                    target: spec.target.clone(),
                    fstype: spec.fstype.into(),
                    source: e,
                })?;
            tracing::debug!(target = %spec.target.display(), fstype = spec.fstype, "mounted");
        }
        Ok(())
    }
}

/// Mounts `/proc`, `/sys`, `/dev`, `/dev/pts` and `/dev/shm` under `root`.
///
/// # Errors
///
/// Returns an error if a target cannot be created or a mount fails.
pub fn mount_special_filesystems(root: &Path, syscall: &dyn Syscall) -> Result<()> {
    MountPlan::special_filesystems(root).apply(syscall)?;
    tracing::info!(root = %root.display(), "special filesystems mounted");
    Ok(())
}

/// Creates a bind mount from `source` to `target`.
///
/// # Errors
///
/// Returns [`CorralError::MountFailed`] if the mount fails.
pub fn bind_mount(
    source: &Path,
    target: &Path,
    recursive: bool,
    syscall: &dyn Syscall,
) -> Result<()> {
    let flags = if recursive {
        MsFlags::MS_BIND | MsFlags::MS_REC
    } else {
        MsFlags::MS_BIND
    };
    syscall
        .mount(Some(source), target, None, flags, None)
        .map_err(|e| CorralError::MountFailed {
            target: target.to_path_buf(),
            fstype: "bind".into(),
            source: e,
        })?;
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        "bind mounted"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::test::{CallKind, TestSyscall};

    #[test]
    fn special_filesystems_are_mounted_in_fixed_order() {
        let root = tempfile::tempdir().unwrap();
        let syscall = TestSyscall::default();

        mount_special_filesystems(root.path(), &syscall).unwrap();

        let targets: Vec<_> = syscall.mounts().into_iter().map(|m| m.target).collect();
        assert_eq!(
            targets,
            vec![
                root.path().join("proc"),
                root.path().join("sys"),
                root.path().join("dev"),
                root.path().join("dev/pts"),
                root.path().join("dev/shm"),
            ]
        );
        assert!(root.path().join("dev/shm").is_dir());
    }

    #[test]
    fn special_filesystems_carry_expected_flags() {
        let plan = MountPlan::special_filesystems(Path::new("/c"));
        let summary: Vec<_> = plan
            .mounts()
            .iter()
            .map(|m| (m.fstype, m.flags, m.data))
            .collect();
        let locked = MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC;
        assert_eq!(
            summary,
            vec![
                ("proc", locked, None),
                ("sysfs", locked, None),
                ("tmpfs", MsFlags::MS_NOSUID, Some("mode=0755")),
                ("devpts", MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC, None),
                ("tmpfs", MsFlags::MS_NOSUID | MsFlags::MS_NODEV, None),
            ]
        );
    }

    #[test]
    fn plan_stops_at_first_failed_mount() {
        let root = tempfile::tempdir().unwrap();
        let syscall = TestSyscall::failing_on_nth(CallKind::Mount, 2);

        let err = mount_special_filesystems(root.path(), &syscall).unwrap_err();

        assert!(matches!(err, CorralError::MountFailed { ref fstype, .. } if fstype == "tmpfs"));
        assert_eq!(syscall.mounts().len(), 2);
        assert!(!root.path().join("dev/pts").exists());
    }

    #[test]
    fn recursive_bind_sets_rec_flag() {
        let syscall = TestSyscall::default();
        bind_mount(Path::new("/a"), Path::new("/a"), true, &syscall).unwrap();
        assert_eq!(syscall.mounts()[0].flags, MsFlags::MS_BIND | MsFlags::MS_REC);
    }
}
