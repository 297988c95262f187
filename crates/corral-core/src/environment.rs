//! Hostname and environment of the container command.
//!
//! Nothing is inherited from the host: the command receives exactly the
//! variables of an [`Environment`] through `execve(2)`.

use std::ffi::CString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use corral_common::constants::{CONTAINER_PATH, CONTAINER_PS1};
use corral_common::error::{CorralError, Result};
use corral_common::types::ContainerId;
use nix::unistd::{Uid, User};

use crate::syscall::Syscall;

/// The user that launched the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invoker {
    /// Launched with effective UID 0.
    Root,
    /// Launched by an unprivileged user with this login name.
    User(String),
}

impl Invoker {
    /// Determines the invoker from the current process credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::EnvironmentSetupFailed`] if the real UID has
    /// no passwd entry.
    pub fn detect() -> Result<Self> {
        if Uid::effective().is_root() {
            return Ok(Self::Root);
        }
        let uid = Uid::current();
        match User::from_uid(uid) {
            Ok(Some(user)) => Ok(Self::User(user.name)),
            Ok(None) => Err(CorralError::EnvironmentSetupFailed {
                message: format!("no passwd entry for uid {uid}"),
            }),
            Err(e) => Err(CorralError::EnvironmentSetupFailed {
                message: format!("look up uid {uid}: {e}"),
            }),
        }
    }

    /// Returns the login name exported as `USER`.
    #[must_use]
    pub fn user_name(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::User(name) => name,
        }
    }

    /// Returns the home directory exported as `HOME`.
    #[must_use]
    pub fn home(&self) -> String {
        match self {
            Self::Root => "/root".to_string(),
            Self::User(name) => format!("/home/{name}"),
        }
    }
}

/// Ordered set of variables handed to the container command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    /// Builds the environment of container `id` launched by `invoker`.
    #[must_use]
    pub fn for_container(id: &ContainerId, invoker: &Invoker) -> Self {
        let vars = [
            ("USER", invoker.user_name().to_string()),
            ("HOME", invoker.home()),
            ("HOSTNAME", id.to_string()),
            ("PATH", CONTAINER_PATH.to_string()),
            ("PS1", CONTAINER_PS1.to_string()),
        ];
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    /// Returns the value of `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every `(key, value)` pair in export order.
    #[must_use]
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Renders the variables as `KEY=value` strings for `execve(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::EnvironmentSetupFailed`] if a variable
    /// contains a NUL byte.
    pub fn to_envp(&self) -> Result<Vec<CString>> {
        self.vars
            .iter()
            .map(|(k, v)| {
                CString::new(format!("{k}={v}")).map_err(|e| CorralError::EnvironmentSetupFailed {
                    message: format!("variable {k}: {e}"),
                })
            })
            .collect()
    }

    /// Resolves `program` the way a shell would, against this `PATH`.
    ///
    /// A name containing `/` is returned as is. Returns `None` if no
    /// executable file is found.
    #[must_use]
    pub fn resolve_program(&self, program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            return Some(PathBuf::from(program));
        }
        search_path(self.get("PATH").unwrap_or_default(), program)
    }
}

fn search_path(path: &str, program: &str) -> Option<PathBuf> {
    path.split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Sets the kernel hostname to the container identity and returns the
/// environment for the final exec.
///
/// Must run inside the container's UTS namespace.
///
/// # Errors
///
/// Returns [`CorralError::EnvironmentSetupFailed`] if the hostname cannot
/// be set.
pub fn configure_environment(
    id: &ContainerId,
    invoker: &Invoker,
    syscall: &dyn Syscall,
) -> Result<Environment> {
    syscall
        .set_hostname(id.as_str())
        .map_err(|e| CorralError::EnvironmentSetupFailed {
            message: format!("set hostname {id}: {e}"),
        })?;
    let env = Environment::for_container(id, invoker);
    tracing::info!(%id, user = invoker.user_name(), "environment configured");
    Ok(env)
}
