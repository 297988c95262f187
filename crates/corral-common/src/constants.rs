//! System-wide constants and default paths.

/// Default directory holding per-container overlay directories.
pub const DEFAULT_CONTAINERS_DIR: &str = "containers";

/// Default directory holding image archives and their extracted caches.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Cgroup v1 hierarchy mount point.
pub const CGROUP_V1_PATH: &str = "/sys/fs/cgroup";

/// Directory grouping every corral cgroup under each controller.
pub const DEFAULT_CGROUP_PREFIX: &str = "corral";

/// Name of the host bridge shared by every container.
pub const DEFAULT_BRIDGE_NAME: &str = "corral0";

/// Default CIDR address of the bridge.
pub const DEFAULT_BRIDGE_ADDR: &str = "10.10.10.1/24";

/// Default CIDR address of the container-side veth.
pub const DEFAULT_CONTAINER_ADDR: &str = "10.10.10.2/24";

/// Name of the overlay upper layer inside a container directory.
pub const ROOTFS_DIR_NAME: &str = "rootfs";

/// Name of the overlay work area inside a container directory.
pub const WORKDIR_DIR_NAME: &str = "workdir";

/// Transient directory the host root lands in during `pivot_root(2)`.
pub const OLD_ROOT_DIR_NAME: &str = "old_root";

/// `PATH` exported to every container.
pub const CONTAINER_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Shell prompt template exported to every container.
pub const CONTAINER_PS1: &str = "$USER@$HOSTNAME$ ";

/// First argument marking a re-executed process as the container init.
pub const INIT_MARKER: &str = "__corral-init";

/// Exit status of a child whose setup failed before the final exec.
pub const SETUP_FAILURE_EXIT_CODE: i32 = 125;

/// Application name used in CLI output.
pub const APP_NAME: &str = "corral";
