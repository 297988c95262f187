//! Linux namespace management for container isolation.
//!
//! The container process is cloned straight into its namespaces; this module
//! owns the flag set used for that clone, the mount-propagation change the
//! child makes first, and the helper the host uses to act inside the
//! child's network namespace.

pub mod mount;
pub mod network;

use nix::sched::CloneFlags;

/// Which namespaces a new container process is cloned into.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate network namespace.
    pub network: bool,
    /// Isolate IPC namespace.
    pub ipc: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            network: true,
            ipc: true,
            uts: true,
        }
    }
}

impl NamespaceConfig {
    /// Returns the `clone(2)` flags selecting the configured namespaces.
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        [
            (self.mount, CloneFlags::CLONE_NEWNS),
            (self.uts, CloneFlags::CLONE_NEWUTS),
            (self.pid, CloneFlags::CLONE_NEWPID),
            (self.ipc, CloneFlags::CLONE_NEWIPC),
            (self.network, CloneFlags::CLONE_NEWNET),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(CloneFlags::empty(), |flags, (_, flag)| flags | flag)
    }
}
