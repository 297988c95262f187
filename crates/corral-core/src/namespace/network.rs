//! Running work inside another process's network namespace.
//!
//! `setns(2)` switches only the calling thread. The work is therefore run on
//! a dedicated scoped thread: whatever namespace that thread ends up in, no
//! other work is ever scheduled on it. The original namespace is still
//! restored before the thread ends, on both success and failure.

use std::fs::File;
use std::io;
use std::thread;

use corral_common::error::{CorralError, Result};
use nix::sched::CloneFlags;

/// Namespace handles and the switch between them.
pub trait NamespaceSwitcher: Sync {
    /// Handle to one network namespace.
    type Handle;

    /// Returns the calling thread's current namespace.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the namespace cannot be opened.
    fn current(&self) -> io::Result<Self::Handle>;

    /// Returns the namespace of process `pid`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the process is gone or inaccessible.
    fn of_pid(&self, pid: u32) -> io::Result<Self::Handle>;

    /// Moves the calling thread into `handle`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by `setns(2)`.
    fn enter(&self, handle: &Self::Handle) -> io::Result<()>;
}

/// Network namespaces reached through `/proc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcNetns;

impl NamespaceSwitcher for ProcNetns {
    type Handle = File;

    fn current(&self) -> io::Result<File> {
        File::open("/proc/thread-self/ns/net")
    }

    fn of_pid(&self, pid: u32) -> io::Result<File> {
        File::open(format!("/proc/{pid}/ns/net"))
    }

    fn enter(&self, handle: &File) -> io::Result<()> {
        nix::sched::setns(handle, CloneFlags::CLONE_NEWNET)?;
        Ok(())
    }
}

/// Executes closures inside a target process's network namespace.
#[derive(Debug, Clone, Default)]
pub struct NetnsExecutor<S> {
    switcher: S,
}

impl<S: NamespaceSwitcher> NetnsExecutor<S> {
    /// Creates an executor switching namespaces through `switcher`.
    pub const fn new(switcher: S) -> Self {
        Self { switcher }
    }

    /// Runs `work` inside the network namespace of `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::NetworkSetupFailed`] if the namespace cannot be
    /// entered or left, or the error returned by `work`.
    pub fn exec<T, F>(&self, pid: u32, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        thread::scope(|scope| scope.spawn(|| self.exec_pinned(pid, work)).join())
            .unwrap_or_else(|_| {
                Err(CorralError::network(
                    format!("run in netns of pid {pid}"),
                    "namespace worker panicked",
                ))
            })
    }

    fn exec_pinned<T>(&self, pid: u32, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let op = || format!("enter netns of pid {pid}");
        let original = self
            .switcher
            .current()
            .map_err(|e| CorralError::network(op(), e))?;
        let target = self
            .switcher
            .of_pid(pid)
            .map_err(|e| CorralError::network(op(), e))?;
        self.switcher
            .enter(&target)
            .map_err(|e| CorralError::network(op(), e))?;
        tracing::trace!(pid, "entered network namespace");

        let result = work();

        match (result, self.switcher.enter(&original)) {
            (result, Ok(())) => result,
            (Ok(_), Err(e)) => Err(CorralError::network(
                format!("restore netns after pid {pid}"),
                e,
            )),
            (Err(err), Err(e)) => {
                tracing::error!(pid, error = %e, "failed to restore network namespace");
                Err(err)
            }
        }
    }
}
