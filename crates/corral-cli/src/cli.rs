//! Command-line arguments and their mapping onto a launch request.

use std::path::PathBuf;

use clap::Parser;
use corral_common::constants::{
    DEFAULT_BRIDGE_ADDR, DEFAULT_CONTAINER_ADDR, DEFAULT_CONTAINERS_DIR, DEFAULT_IMAGES_DIR,
    SETUP_FAILURE_EXIT_CODE,
};
use corral_common::error::{CorralError, ErrorKind};
use corral_runtime::LaunchRequest;

/// Exit status for a malformed command line or request.
pub const USAGE_EXIT_CODE: i32 = 2;

/// corral: run a command in an isolated container built from a local image.
#[derive(Parser, Debug)]
#[command(name = "corral", version, about, long_about = None)]
pub struct Cli {
    /// Image name; `<images>/<image>.tar[.gz]` is the archive.
    pub image: String,

    /// Command and arguments to run inside the container.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Directory holding per-container overlay directories.
    #[arg(short, long, env = "CORRAL_CONTAINERS", default_value = DEFAULT_CONTAINERS_DIR)]
    pub containers: PathBuf,

    /// Directory holding image archives and extracted images.
    #[arg(short, long, env = "CORRAL_IMAGES", default_value = DEFAULT_IMAGES_DIR)]
    pub images: PathBuf,

    /// CPU shares; 0 keeps the kernel default.
    #[arg(long, default_value_t = 0)]
    pub cpu: u64,

    /// Memory limit such as `64m`; empty leaves it unset.
    #[arg(long, default_value = "")]
    pub mem: String,

    /// CIDR address of the host bridge.
    #[arg(long, default_value = DEFAULT_BRIDGE_ADDR)]
    pub bridge_addr: String,

    /// CIDR address of the container interface.
    #[arg(long, default_value = DEFAULT_CONTAINER_ADDR)]
    pub container_addr: String,

    /// JSON host configuration file.
    #[arg(long, env = "CORRAL_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Builds the launch request described by these arguments.
    #[must_use]
    pub fn request(&self) -> LaunchRequest {
        LaunchRequest {
            containers_dir: self.containers.clone(),
            images_dir: self.images.clone(),
            image_name: self.image.clone(),
            command: self.command.clone(),
            cpu_shares: self.cpu,
            mem_limit: self.mem.clone(),
            bridge_addr: self.bridge_addr.clone(),
            container_addr: self.container_addr.clone(),
        }
    }
}

/// Maps a failed launch onto the process exit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CorralError>().map(CorralError::kind) {
        Some(ErrorKind::InvalidRequest) => USAGE_EXIT_CODE,
        _ => SETUP_FAILURE_EXIT_CODE,
    }
}
