//! Root filesystem assembly against a real image archive.
//!
//! Archives are extracted for real; kernel calls go to the recording
//! syscall so that no privileges are needed.

#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

use std::path::Path;

use corral_common::paths::ContainerPaths;
use corral_common::types::ContainerId;
use corral_core::syscall::test::{Call, TestSyscall};
use corral_image::TarExtractor;
use corral_runtime::rootfs::build_root_filesystem;

fn write_alpine(images: &Path) {
    let file = std::fs::File::create(images.join("alpine.tar.gz")).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in [
        ("bin/sh", "#!busybox", 0o755),
        ("etc/os-release", "ID=alpine\n", 0o644),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    let _ = builder.into_inner().unwrap().finish().unwrap();
}

#[test]
fn image_is_extracted_once_and_shared_by_containers() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("images");
    let containers = tmp.path().join("containers");
    std::fs::create_dir(&images).unwrap();
    write_alpine(&images);

    let first = ContainerPaths::new(&containers, &images, "alpine", &ContainerId::generate());
    let second = ContainerPaths::new(&containers, &images, "alpine", &ContainerId::generate());
    build_root_filesystem(&first, &TarExtractor, &TestSyscall::default()).unwrap();

    let os_release = images.join("alpine/etc/os-release");
    assert_eq!(std::fs::read_to_string(&os_release).unwrap(), "ID=alpine\n");
    let marker = images.join("alpine/etc/extracted-once");
    std::fs::write(&marker, "").unwrap();

    build_root_filesystem(&second, &TarExtractor, &TestSyscall::default()).unwrap();
    assert!(marker.exists(), "cached image was extracted again");
    assert!(second.container_root().is_dir());
    assert!(second.container_workdir().is_dir());
}

#[test]
fn overlay_stacks_container_root_on_extracted_image() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_alpine(&images);
    let paths = ContainerPaths::new(
        &tmp.path().join("containers"),
        &images,
        "alpine",
        &ContainerId::new("c-overlay"),
    );
    let syscall = TestSyscall::default();

    build_root_filesystem(&paths, &TarExtractor, &syscall).unwrap();

    let Some(Call::Mount(overlay)) = syscall.calls().into_iter().next() else {
        panic!("first call is not a mount");
    };
    let data = overlay.data.unwrap();
    assert!(data.contains(&format!("lowerdir={}", images.join("alpine").display())));
    assert!(data.contains(&format!("upperdir={}", paths.container_root().display())));
    assert!(data.contains(&format!("workdir={}", paths.container_workdir().display())));
}

#[test]
fn pivot_is_the_last_step() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_alpine(&images);
    let paths = ContainerPaths::new(
        &tmp.path().join("containers"),
        &images,
        "alpine",
        &ContainerId::new("c-pivot"),
    );
    let syscall = TestSyscall::default();

    build_root_filesystem(&paths, &TarExtractor, &syscall).unwrap();

    let calls = syscall.calls();
    let pivot = calls
        .iter()
        .position(|c| matches!(c, Call::PivotRoot { .. }))
        .unwrap();
    assert_eq!(calls.len() - pivot, 4);
    assert_eq!(
        calls.last(),
        Some(&Call::RemoveDir("/old_root".into()))
    );
}
