//! The container side of a launch.
//!
//! Runs in the re-executed process, already inside the new namespaces. Any
//! failure is sent to the host as a setup report and ends the process with
//! [`SETUP_FAILURE_EXIT_CODE`]; success replaces the process with the user
//! command.

use std::convert::Infallible;
use std::ffi::CString;
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use corral_common::config::CorralConfig;
use corral_common::constants::SETUP_FAILURE_EXIT_CODE;
use corral_common::error::{CorralError, Result};
use corral_common::paths::ContainerPaths;
use corral_common::types::ContainerId;
use corral_core::cgroup::{CgroupManager, CgroupSpec};
use corral_core::environment::{Environment, Invoker, configure_environment};
use corral_core::namespace::mount::make_mounts_private;
use corral_core::syscall::{LinuxSyscall, Syscall};
use corral_image::{ImageExtractor, TarExtractor};
use nix::errno::Errno;
use serde::{Deserialize, Serialize};

use crate::request::LaunchRequest;
use crate::rootfs::build_root_filesystem;

/// What the host hands to the container process on its command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    /// Identity of the container.
    pub id: ContainerId,
    /// The validated request.
    pub request: LaunchRequest,
    /// Host configuration.
    pub config: CorralConfig,
}

/// Entry point of the re-executed container process.
///
/// `args` are the arguments following the init marker: the JSON payload
/// and the report pipe descriptor. Returns only on failure, with the exit
/// status to use.
pub fn run(args: &[String]) -> i32 {
    let [payload, fd] = args else {
        tracing::error!(count = args.len(), "container init expects a payload and a descriptor");
        return SETUP_FAILURE_EXIT_CODE;
    };
    let Ok(fd) = fd.parse::<i32>() else {
        tracing::error!(fd = %fd, "invalid report descriptor");
        return SETUP_FAILURE_EXIT_CODE;
    };
    // SAFETY: the host passed the write end of the report pipe under this
    // number and nothing else in this process owns it.
    let reports = File::from(unsafe { OwnedFd::from_raw_fd(fd) });

    let result = serde_json::from_str::<InitPayload>(payload)
        .map_err(CorralError::from)
        .and_then(|payload| setup_and_exec(&payload, &reports));
    if let Err(err) = result {
        tracing::error!(error = %err, "container setup failed");
        crate::report::send(&reports, &err);
    }
    SETUP_FAILURE_EXIT_CODE
}

fn setup_and_exec(payload: &InitPayload, reports: &File) -> Result<Infallible> {
    let _span = tracing::info_span!("init", id = %payload.id).entered();
    let env = prepare(
        payload,
        &LinuxSyscall,
        &CgroupManager::from_config(&payload.config),
        &TarExtractor,
    )?;
    close_on_exec(reports)?;
    exec_command(&payload.request.command, &env)
}

/// Runs every setup step short of the final exec and returns the
/// environment the command is run with.
///
/// Mount propagation is cut first. The hostname, the cgroups and the root
/// filesystem all use `payload.id`.
///
/// # Errors
///
/// Returns the error of the first step that fails.
pub fn prepare(
    payload: &InitPayload,
    syscall: &dyn Syscall,
    cgroups: &CgroupManager,
    extractor: &dyn ImageExtractor,
) -> Result<Environment> {
    make_mounts_private(syscall)?;

    let invoker = Invoker::detect()?;
    let env = configure_environment(&payload.id, &invoker, syscall)?;

    let spec = CgroupSpec::new(std::process::id(), &payload.request.limits());
    cgroups.install(&payload.id, &spec)?;

    let request = &payload.request;
    let paths = ContainerPaths::new(
        &request.containers_dir,
        &request.images_dir,
        &request.image_name,
        &payload.id,
    );
    build_root_filesystem(&paths, extractor, syscall)?;
    Ok(env)
}

/// Re-arms close-on-exec on the report pipe, so that a successful exec
/// closes it and the host reads EOF.
fn close_on_exec(reports: &File) -> Result<()> {
    // SAFETY: F_SETFD on a descriptor owned by `reports`.
    let rc = unsafe { libc::fcntl(reports.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
    Errno::result(rc)
        .map(drop)
        .map_err(|e| CorralError::SpawnFailed { source: e.into() })
}

/// Replaces the process with `command`, resolved against the container
/// `PATH` and run with exactly `env`.
fn exec_command(command: &[String], env: &Environment) -> Result<Infallible> {
    let name = command.first().map_or("", String::as_str);
    let exec_error = |source| CorralError::ExecFailed {
        program: name.to_string(),
        source,
    };

    let program = env
        .resolve_program(name)
        .ok_or_else(|| exec_error(std::io::Error::from(std::io::ErrorKind::NotFound)))?;
    let program = CString::new(program.as_os_str().as_encoded_bytes())
        .map_err(|e| exec_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
    let argv = command
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| exec_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
    let envp = env.to_envp()?;

    tracing::info!(program = name, "executing container command");
    nix::unistd::execve(&program, &argv, &envp).map_err(|e| exec_error(e.into()))
}
