//! Launch requests and their validation.

use std::path::PathBuf;

use corral_common::error::{CorralError, Result};
use corral_common::types::ResourceLimits;
use corral_core::network::NetworkTopology;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Everything needed to launch one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Directory holding per-container overlay directories.
    pub containers_dir: PathBuf,
    /// Directory holding image archives and extracted images.
    pub images_dir: PathBuf,
    /// Name of the image, without extension.
    pub image_name: String,
    /// Command and arguments run inside the container.
    pub command: Vec<String>,
    /// CPU shares; `0` leaves the kernel default.
    pub cpu_shares: u64,
    /// Memory limit such as `64m`; empty leaves it unset.
    pub mem_limit: String,
    /// CIDR address of the host bridge.
    pub bridge_addr: String,
    /// CIDR address of the container interface.
    pub container_addr: String,
}

impl LaunchRequest {
    /// Checks the request before anything privileged happens.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::InvalidRequest`] describing the first
    /// rejected field.
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(CorralError::invalid("command must not be empty"));
        }
        if self.command.iter().any(|arg| arg.contains('\0')) {
            return Err(CorralError::invalid("command must not contain NUL bytes"));
        }
        validate_image_name(&self.image_name)?;
        validate_memory_limit(&self.mem_limit)?;
        let _ = parse_cidr("bridge address", &self.bridge_addr)?;
        let _ = parse_cidr("container address", &self.container_addr)?;
        Ok(())
    }

    /// Returns the cgroup limits requested.
    #[must_use]
    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            cpu_shares: self.cpu_shares,
            memory_limit: (!self.mem_limit.is_empty()).then(|| self.mem_limit.clone()),
        }
    }

    /// Returns the network layout using the host bridge `bridge_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::InvalidRequest`] if an address is not CIDR.
    pub fn topology(&self, bridge_name: &str) -> Result<NetworkTopology> {
        Ok(NetworkTopology {
            bridge_name: bridge_name.to_string(),
            bridge_addr: parse_cidr("bridge address", &self.bridge_addr)?,
            container_addr: parse_cidr("container address", &self.container_addr)?,
        })
    }
}

fn validate_image_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CorralError::invalid("image name must not be empty"));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(CorralError::invalid(format!(
            "image name {name:?} must not be a path"
        )));
    }
    Ok(())
}

/// Accepts the forms understood by `memory.limit_in_bytes`: digits with an
/// optional `k`, `m` or `g` suffix in either case.
fn validate_memory_limit(limit: &str) -> Result<()> {
    if limit.is_empty() {
        return Ok(());
    }
    let digits = limit
        .strip_suffix(['k', 'K', 'm', 'M', 'g', 'G'])
        .unwrap_or(limit);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CorralError::invalid(format!(
            "memory limit {limit:?} must be a number with an optional k, m or g suffix"
        )));
    }
    Ok(())
}

/// Parses `address/prefix`; a bare address is rejected.
fn parse_cidr(field: &str, value: &str) -> Result<IpNetwork> {
    if !value.contains('/') {
        return Err(CorralError::invalid(format!(
            "{field} {value:?} must include a prefix length"
        )));
    }
    value
        .parse()
        .map_err(|e| CorralError::invalid(format!("{field} {value:?}: {e}")))
}
