//! # corral-core
//!
//! Low-level Linux isolation primitives for the corral runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: clone flags, mount propagation, and running work inside
//!   another process's network namespace.
//! - **Cgroups v1**: per-container `cpu` and `memory` groups.
//! - **Filesystem**: `OverlayFS` assembly, special filesystems, device nodes
//!   and `pivot_root`.
//! - **Network**: the shared bridge, per-container veth pairs and their
//!   addressing.
//! - **Environment**: hostname and the variables handed to the final exec.
//!
//! Every privileged call goes through the [`syscall::Syscall`] seam so the
//! setup sequences can be verified without privileges.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod environment;
pub mod filesystem;
pub mod namespace;
pub mod network;
pub mod syscall;
