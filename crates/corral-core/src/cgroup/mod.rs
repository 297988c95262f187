//! Cgroups v1 resource management.
//!
//! Each container gets one directory per controller at
//! `<root>/<controller>/<prefix>/<container_id>`. The caller's own PID is
//! written to `cgroup.procs` before it execs the user command, so the
//! command inherits the membership. `notify_on_release` is set so the kernel
//! reclaims the directory once the group is empty; nothing here removes it.

pub mod cpu;
pub mod memory;

use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use corral_common::config::CorralConfig;
use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerId, ResourceLimits};

/// File listing the member processes of a cgroup.
pub const CGROUP_PROCS: &str = "cgroup.procs";

/// File asking the kernel to release the cgroup once it is empty.
pub const NOTIFY_ON_RELEASE: &str = "notify_on_release";

/// Ordered `(file, content)` pairs for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSpec {
    /// Controller name, also the hierarchy directory name.
    pub controller: &'static str,
    /// Files written into the cgroup directory, in order.
    pub entries: Vec<(String, String)>,
}

/// Content of every cgroup file written for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupSpec {
    controllers: Vec<ControllerSpec>,
}

impl CgroupSpec {
    /// Builds the spec placing `pid` into limited `cpu` and `memory` groups.
    ///
    /// Limits are written before membership so the process never runs in
    /// the group unconstrained.
    #[must_use]
    pub fn new(pid: u32, limits: &ResourceLimits) -> Self {
        let controller = |name, limit_entries: Vec<(String, String)>| {
            let mut entries = limit_entries;
            entries.push((NOTIFY_ON_RELEASE.to_string(), "1".to_string()));
            entries.push((CGROUP_PROCS.to_string(), pid.to_string()));
            ControllerSpec {
                controller: name,
                entries,
            }
        };
        Self {
            controllers: vec![
                controller("cpu", cpu::limit_entries(limits.cpu_shares)),
                controller(
                    "memory",
                    memory::limit_entries(limits.memory_limit.as_deref()),
                ),
            ],
        }
    }

    /// Returns the per-controller entries in installation order.
    #[must_use]
    pub fn controllers(&self) -> &[ControllerSpec] {
        &self.controllers
    }

    /// Returns the entries of one controller, if present.
    #[must_use]
    pub fn controller(&self, name: &str) -> Option<&ControllerSpec> {
        self.controllers.iter().find(|c| c.controller == name)
    }
}

/// Installs container cgroups below a cgroup v1 mount point.
#[derive(Debug, Clone)]
pub struct CgroupManager {
    root: PathBuf,
    prefix: String,
}

impl CgroupManager {
    /// Creates a manager rooted at `root`, grouping cgroups under `prefix`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates a manager from the host configuration.
    #[must_use]
    pub fn from_config(config: &CorralConfig) -> Self {
        Self::new(&config.cgroup_root, &config.cgroup_prefix)
    }

    /// Returns the cgroup directory of `id` for `controller`.
    #[must_use]
    pub fn cgroup_dir(&self, controller: &str, id: &ContainerId) -> PathBuf {
        self.root
            .join(controller)
            .join(&self.prefix)
            .join(id.as_str())
    }

    /// Creates every controller directory and writes every spec entry.
    ///
    /// Each entry is a full-file overwrite. Any failure aborts the
    /// installation; directories created so far are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::CgroupSetupFailed`] if a directory cannot be
    /// created or a control file cannot be written.
    pub fn install(&self, id: &ContainerId, spec: &CgroupSpec) -> Result<()> {
        for controller in spec.controllers() {
            let dir = self.cgroup_dir(controller.controller, id);
            create_cgroup_dir(&dir)?;
            for (file, content) in &controller.entries {
                write_cgroup_file(&dir.join(file), content)?;
            }
            tracing::info!(
                controller = controller.controller,
                path = %dir.display(),
                "cgroup installed"
            );
        }
        Ok(())
    }
}

fn create_cgroup_dir(dir: &Path) -> Result<()> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
        .map_err(|e| CorralError::CgroupSetupFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

fn write_cgroup_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| CorralError::CgroupSetupFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), content, "cgroup file written");
    Ok(())
}
