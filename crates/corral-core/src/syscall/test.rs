//! Recording [`Syscall`] used by unit and integration tests.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use nix::mount::{MntFlags, MsFlags};
use nix::sys::stat::{Mode, SFlag};

use super::Syscall;

/// Arguments of a recorded `mount(2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountArgs {
    /// Mount source.
    pub source: Option<PathBuf>,
    /// Mount point.
    pub target: PathBuf,
    /// Filesystem type.
    pub fstype: Option<String>,
    /// Mount flags.
    pub flags: MsFlags,
    /// Filesystem-specific data.
    pub data: Option<String>,
}

/// Arguments of a recorded `mknod(2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MknodArgs {
    /// Node path.
    pub path: PathBuf,
    /// File type.
    pub kind: SFlag,
    /// Permission bits.
    pub perm: Mode,
    /// Device number.
    pub dev: u64,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `mount(2)`.
    Mount(MountArgs),
    /// `umount2(2)`.
    Umount {
        /// Mount point.
        target: PathBuf,
        /// Unmount flags.
        flags: MntFlags,
    },
    /// `pivot_root(2)`.
    PivotRoot {
        /// New root.
        new_root: PathBuf,
        /// Where the old root lands.
        put_old: PathBuf,
    },
    /// `chdir(2)`.
    Chdir(PathBuf),
    /// `mknod(2)`.
    Mknod(MknodArgs),
    /// Symlink creation.
    Symlink {
        /// Link target.
        original: PathBuf,
        /// Link path.
        link: PathBuf,
    },
    /// `sethostname(2)`.
    Hostname(String),
    /// Directory removal.
    RemoveDir(PathBuf),
}

/// Discriminant of a [`Call`], used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `mount(2)`.
    Mount,
    /// `umount2(2)`.
    Umount,
    /// `pivot_root(2)`.
    PivotRoot,
    /// `chdir(2)`.
    Chdir,
    /// `mknod(2)`.
    Mknod,
    /// Symlink creation.
    Symlink,
    /// `sethostname(2)`.
    Hostname,
    /// Directory removal.
    RemoveDir,
}

impl Call {
    /// Returns the discriminant of this call.
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::Mount(_) => CallKind::Mount,
            Self::Umount { .. } => CallKind::Umount,
            Self::PivotRoot { .. } => CallKind::PivotRoot,
            Self::Chdir(_) => CallKind::Chdir,
            Self::Mknod(_) => CallKind::Mknod,
            Self::Symlink { .. } => CallKind::Symlink,
            Self::Hostname(_) => CallKind::Hostname,
            Self::RemoveDir(_) => CallKind::RemoveDir,
        }
    }
}

/// Records every call instead of touching the kernel.
///
/// A failure can be injected for the n-th call of one [`CallKind`]; failed
/// calls are not recorded.
#[derive(Debug, Default)]
pub struct TestSyscall {
    calls: RefCell<Vec<Call>>,
    failure: Option<(CallKind, usize)>,
    seen: RefCell<usize>,
}

impl TestSyscall {
    /// Creates a recorder whose first call of `kind` fails with `EPERM`.
    #[must_use]
    pub fn failing_on(kind: CallKind) -> Self {
        Self::failing_on_nth(kind, 0)
    }

    /// Creates a recorder whose `nth` (zero-based) call of `kind` fails.
    #[must_use]
    pub fn failing_on_nth(kind: CallKind, nth: usize) -> Self {
        Self {
            failure: Some((kind, nth)),
            ..Self::default()
        }
    }

    /// Returns every recorded call in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Returns the recorded mounts in order.
    pub fn mounts(&self) -> Vec<MountArgs> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Mount(args) => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the recorded device nodes in order.
    pub fn mknods(&self) -> Vec<MknodArgs> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Mknod(args) => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> io::Result<()> {
        if let Some((kind, nth)) = self.failure {
            if call.kind() == kind {
                let mut seen = self.seen.borrow_mut();
                *seen += 1;
                if *seen == nth + 1 {
                    return Err(io::Error::from_raw_os_error(nix::errno::Errno::EPERM as i32));
                }
            }
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl Syscall for TestSyscall {
    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> io::Result<()> {
        self.record(Call::Mount(MountArgs {
            source: source.map(Path::to_path_buf),
            target: target.to_path_buf(),
            fstype: fstype.map(str::to_string),
            flags,
            data: data.map(str::to_string),
        }))
    }

    fn umount2(&self, target: &Path, flags: MntFlags) -> io::Result<()> {
        self.record(Call::Umount {
            target: target.to_path_buf(),
            flags,
        })
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> io::Result<()> {
        self.record(Call::PivotRoot {
            new_root: new_root.to_path_buf(),
            put_old: put_old.to_path_buf(),
        })
    }

    fn chdir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Chdir(path.to_path_buf()))
    }

    fn mknod(&self, path: &Path, kind: SFlag, perm: Mode, dev: u64) -> io::Result<()> {
        self.record(Call::Mknod(MknodArgs {
            path: path.to_path_buf(),
            kind,
            perm,
            dev,
        }))
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        self.record(Call::Symlink {
            original: original.to_path_buf(),
            link: link.to_path_buf(),
        })
    }

    fn set_hostname(&self, hostname: &str) -> io::Result<()> {
        self.record(Call::Hostname(hostname.to_string()))
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::RemoveDir(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let syscall = TestSyscall::default();
        syscall.set_hostname("abc").unwrap();
        syscall.chdir(Path::new("/")).unwrap();
        assert_eq!(
            syscall.calls(),
            vec![Call::Hostname("abc".into()), Call::Chdir("/".into())]
        );
    }

    #[test]
    fn injected_failure_hits_only_nth_call() {
        let syscall = TestSyscall::failing_on_nth(CallKind::Chdir, 1);
        assert!(syscall.chdir(Path::new("/a")).is_ok());
        assert!(syscall.chdir(Path::new("/b")).is_err());
        assert!(syscall.chdir(Path::new("/c")).is_ok());
        assert_eq!(syscall.calls().len(), 2);
    }
}
