//! Device synthesis inside the container's `/dev` tmpfs.
//!
//! Device numbers follow the kernel's `admin-guide/devices.txt`.

use std::path::{Path, PathBuf};

use corral_common::error::{CorralError, Result};
use nix::sys::stat::{Mode, SFlag, makedev};

use crate::syscall::Syscall;

/// A character device created in `/dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Name below `/dev`.
    pub name: &'static str,
    /// Major number.
    pub major: u64,
    /// Minor number.
    pub minor: u64,
}

const fn chr(name: &'static str, major: u64, minor: u64) -> DeviceSpec {
    DeviceSpec { name, major, minor }
}

/// Character devices every container gets.
pub const DEVICES: [DeviceSpec; 7] = [
    chr("null", 1, 3),
    chr("zero", 1, 5),
    chr("full", 1, 7),
    chr("random", 1, 8),
    chr("urandom", 1, 9),
    chr("tty", 5, 0),
    chr("ptmx", 5, 2),
];

/// Permission bits of every device node.
pub const DEVICE_MODE: u32 = 0o666;

/// Symlinks to the standard descriptors, as `(name, target)`.
pub const FD_LINKS: [(&str, &str); 4] = [
    ("fd", "/proc/self/fd"),
    ("stdin", "/proc/self/fd/0"),
    ("stdout", "/proc/self/fd/1"),
    ("stderr", "/proc/self/fd/2"),
];

/// Populates `<root>/dev` with fd links, device nodes and the console.
///
/// Expects `/dev` and `/dev/pts` to be mounted already.
///
/// # Errors
///
/// Returns [`CorralError::DeviceCreationFailed`] if a link, node or the
/// console file cannot be created, or [`CorralError::MountFailed`] if the
/// console bind mount fails.
pub fn create_devices(root: &Path, syscall: &dyn Syscall) -> Result<()> {
    let dev = root.join("dev");

    for (name, target) in FD_LINKS {
        let link = dev.join(name);
        syscall
            .symlink(Path::new(target), &link)
            .map_err(|e| device_error(link, e))?;
    }

    let mode = Mode::from_bits_truncate(DEVICE_MODE);
    for device in DEVICES {
        let path = dev.join(device.name);
        syscall
            .mknod(&path, SFlag::S_IFCHR, mode, makedev(device.major, device.minor))
            .map_err(|e| device_error(path, e))?;
    }

    bind_console(&dev, syscall)?;
    tracing::info!(dev = %dev.display(), "devices created");
    Ok(())
}

/// Binds the container's first pty onto an empty `/dev/console` file.
///
/// A fresh devpts instance may not have allocated `pts/1` yet; the console
/// is then left as an empty file.
fn bind_console(dev: &Path, syscall: &dyn Syscall) -> Result<()> {
    let console = dev.join("console");
    let _ = std::fs::File::create(&console).map_err(|e| device_error(console.clone(), e))?;

    let pty = dev.join("pts").join("1");
    if !pty.exists() {
        tracing::warn!(pty = %pty.display(), "no pty to bind as console");
        return Ok(());
    }
    super::mount::bind_mount(&pty, &console, false, syscall)
}

fn device_error(path: PathBuf, source: std::io::Error) -> CorralError {
    CorralError::DeviceCreationFailed { path, source }
}
