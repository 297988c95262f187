//! Container launch for the corral runtime.
//!
//! The host side ([`launcher`]) validates a [`request::LaunchRequest`],
//! clones a child into fresh namespaces that re-executes this binary, wires
//! the child's network from the host and waits for it. The child side
//! ([`init`]) installs cgroups, builds the root filesystem
//! ([`rootfs`]) and execs the user command.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::panic, clippy::unwrap_used))]

pub mod init;
pub mod launcher;
pub mod process;
pub mod report;
pub mod request;
pub mod rootfs;

pub use launcher::Launcher;
pub use request::LaunchRequest;
