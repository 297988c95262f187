//! Root filesystem composition for the container process.

use corral_common::error::Result;
use corral_common::paths::ContainerPaths;
use corral_core::filesystem::device::create_devices;
use corral_core::filesystem::mount::mount_special_filesystems;
use corral_core::filesystem::overlayfs::{OverlayConfig, mount_overlay};
use corral_core::filesystem::pivot_root::pivot_root;
use corral_core::syscall::Syscall;
use corral_image::{ImageExtractor, ImageStore};

/// Builds the container root and makes it the process root.
///
/// Extraction (skipped when cached), overlay, special filesystems, devices
/// and pivot run in that order, each only after the previous one
/// succeeded. Nothing is undone on failure.
///
/// # Errors
///
/// Returns the error of the first step that fails.
pub fn build_root_filesystem(
    paths: &ContainerPaths,
    extractor: &dyn ImageExtractor,
    syscall: &dyn Syscall,
) -> Result<()> {
    let images = ImageStore::new(paths.images_dir(), extractor);
    let _ = images.ensure_extracted(paths.image_name())?;

    mount_overlay(&OverlayConfig::for_container(paths), syscall)?;

    let root = paths.container_root();
    mount_special_filesystems(&root, syscall)?;
    create_devices(&root, syscall)?;
    pivot_root(&root, syscall)?;

    tracing::info!(root = %root.display(), "root filesystem ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use corral_common::error::CorralError;
    use corral_common::types::ContainerId;
    use corral_core::syscall::test::{Call, CallKind, TestSyscall};

    use super::*;

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    impl ImageExtractor for CountingExtractor {
        fn extract(&self, _archive: &Path, dest: &Path) -> Result<()> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(dest.join("bin")).unwrap();
            Ok(())
        }
    }

    struct Layout {
        _tmp: tempfile::TempDir,
        containers: std::path::PathBuf,
        images: std::path::PathBuf,
    }

    fn layout() -> Layout {
        let tmp = tempfile::tempdir().unwrap();
        let containers = tmp.path().join("containers");
        let images = tmp.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("alpine.tar.gz"), "").unwrap();
        Layout {
            _tmp: tmp,
            containers,
            images,
        }
    }

    fn paths(layout: &Layout, id: &str) -> ContainerPaths {
        ContainerPaths::new(
            &layout.containers,
            &layout.images,
            "alpine",
            &ContainerId::new(id),
        )
    }

    #[test]
    fn steps_run_in_order() {
        let layout = layout();
        let paths = paths(&layout, "c-1");
        let syscall = TestSyscall::default();

        build_root_filesystem(&paths, &CountingExtractor::default(), &syscall).unwrap();

        let kinds: Vec<_> = syscall.calls().iter().map(Call::kind).collect();
        let mut expected = vec![CallKind::Mount; 6];
        expected.extend([CallKind::Symlink; 4]);
        expected.extend([CallKind::Mknod; 7]);
        expected.extend([
            CallKind::Mount,
            CallKind::PivotRoot,
            CallKind::Chdir,
            CallKind::Umount,
            CallKind::RemoveDir,
        ]);
        assert_eq!(kinds, expected);

        let mounts = syscall.mounts();
        assert_eq!(mounts[0].fstype.as_deref(), Some("overlay"));
        assert_eq!(mounts[0].target, paths.container_root());
        assert_eq!(mounts[1].target, paths.container_root().join("proc"));
    }

    #[test]
    fn second_container_reuses_extracted_image() {
        let layout = layout();
        let extractor = CountingExtractor::default();

        build_root_filesystem(&paths(&layout, "c-1"), &extractor, &TestSyscall::default()).unwrap();
        build_root_filesystem(&paths(&layout, "c-2"), &extractor, &TestSyscall::default()).unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(layout.images.join("alpine/bin").is_dir());
    }

    #[test]
    fn failed_overlay_stops_before_special_mounts() {
        let layout = layout();
        let syscall = TestSyscall::failing_on(CallKind::Mount);

        let err = build_root_filesystem(
            &paths(&layout, "c-3"),
            &CountingExtractor::default(),
            &syscall,
        )
        .unwrap_err();

        assert!(matches!(err, CorralError::MountFailed { ref fstype, .. } if fstype == "overlay"));
        assert!(syscall.calls().is_empty());
    }
}
