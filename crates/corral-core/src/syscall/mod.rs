//! Wrapper of the syscalls used to assemble a container.
//!
//! Setup code talks to the kernel only through [`Syscall`], so the exact
//! sequence of mounts, device nodes and pivots can be recorded by
//! [`test::TestSyscall`] instead of being applied to the host.

pub mod linux;
pub mod test;

use std::io;
use std::path::Path;

use nix::mount::{MntFlags, MsFlags};
use nix::sys::stat::{Mode, SFlag};

pub use linux::LinuxSyscall;

/// Kernel functionality required to build a container.
pub trait Syscall {
    /// `mount(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()>;

    /// `umount2(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn umount2(&self, target: &Path, flags: MntFlags) -> io::Result<()>;

    /// `pivot_root(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()>;

    /// `chdir(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn chdir(&self, path: &Path) -> io::Result<()>;

    /// `mknod(2)`. The node ends up with exactly `perm`, whatever the
    /// process umask.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn mknod(&self, path: &Path, kind: SFlag, perm: Mode, dev: u64) -> io::Result<()>;

    /// Creates a symbolic link at `link` pointing to `original`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// `sethostname(2)`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn set_hostname(&self, hostname: &str) -> io::Result<()>;

    /// Removes an empty directory.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the kernel.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}
