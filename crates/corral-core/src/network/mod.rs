//! Container networking: a shared host bridge and one veth pair per
//! container.
//!
//! The host end `veth<pid>h` is enslaved to the bridge; the container end
//! `veth<pid>c` is moved into the container's network namespace and
//! addressed there. Configuration runs on the host while the container
//! process sets itself up, so the container may already be gone when its
//! end is moved. That case is a logged no-op, not an error.

pub mod link;
pub mod rtnl;

use corral_common::error::{CorralError, Result};
use ipnetwork::IpNetwork;

pub use link::{Link, LinkManager};
pub use rtnl::RtnetlinkLinkManager;

use crate::namespace::network::{NamespaceSwitcher, NetnsExecutor, ProcNetns};

/// Bridge and addresses shared by every container on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTopology {
    /// Name of the host bridge.
    pub bridge_name: String,
    /// CIDR address assigned to the bridge.
    pub bridge_addr: IpNetwork,
    /// CIDR address assigned to the container end of the veth pair.
    pub container_addr: IpNetwork,
}

/// Returns the name of the host end of the veth pair of `pid`.
#[must_use]
pub fn host_veth_name(pid: u32) -> String {
    format!("veth{pid}h")
}

/// Returns the name of the container end of the veth pair of `pid`.
#[must_use]
pub fn container_veth_name(pid: u32) -> String {
    format!("veth{pid}c")
}

/// Returns whether process `pid` exists and has not exited.
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // The state field follows the parenthesised command name, which may
    // itself contain spaces or parentheses.
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next());
    !matches!(state, None | Some("Z" | "X"))
}

/// Wires a container process to the host bridge.
pub struct NetworkConfigurator<L, S> {
    links: L,
    netns: NetnsExecutor<S>,
    is_alive: fn(u32) -> bool,
}

impl NetworkConfigurator<RtnetlinkLinkManager, ProcNetns> {
    /// Returns a configurator acting on the real kernel.
    #[must_use]
    pub fn system() -> Self {
        Self::new(RtnetlinkLinkManager, ProcNetns)
    }
}

impl<L: LinkManager, S: NamespaceSwitcher> NetworkConfigurator<L, S> {
    /// Creates a configurator from its link and namespace back ends.
    pub fn new(links: L, switcher: S) -> Self {
        Self {
            links,
            netns: NetnsExecutor::new(switcher),
            is_alive: process_alive,
        }
    }

    /// Replaces the liveness check used after a failed configuration.
    #[must_use]
    pub fn with_liveness(mut self, is_alive: fn(u32) -> bool) -> Self {
        self.is_alive = is_alive;
        self
    }

    /// Connects the network namespace of `pid` to the host bridge.
    ///
    /// Once the veth pair exists, any failure deletes it again. If `pid`
    /// has already exited by then, the failure is logged and `Ok` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::NetworkSetupFailed`] if a link lookup,
    /// creation, address assignment or namespace move fails while the
    /// container is still alive.
    pub fn configure(&self, pid: u32, topology: &NetworkTopology) -> Result<()> {
        let bridge = self.ensure_bridge(topology)?;

        let host_name = host_veth_name(pid);
        let peer_name = container_veth_name(pid);
        self.links.add_veth_pair(&host_name, &peer_name)?;

        let wired = self.require_link(&host_name).and_then(|host| {
            self.attach_host_end(&host, &bridge)?;
            self.attach_container_end(pid, &peer_name, topology)
        });
        match wired {
            Ok(()) => {
                tracing::info!(pid, host = %host_name, peer = %peer_name, "container network ready");
                Ok(())
            }
            Err(err) => self.abandon(pid, &host_name, err),
        }
    }

    /// Finds or creates the bridge, brings it up and addresses it.
    ///
    /// Lookup and creation are two steps; two launches racing to create
    /// the bridge can both miss it and the second creation then fails.
    fn ensure_bridge(&self, topology: &NetworkTopology) -> Result<Link> {
        let bridge = if let Some(bridge) = self.links.find_link(&topology.bridge_name)? {
            tracing::debug!(bridge = %bridge.name, "reusing bridge");
            bridge
        } else {
            self.links.add_bridge(&topology.bridge_name)?;
            tracing::info!(bridge = %topology.bridge_name, "bridge created");
            self.require_link(&topology.bridge_name)?
        };
        self.links.set_up(&bridge)?;
        self.links.replace_address(&bridge, topology.bridge_addr)?;
        Ok(bridge)
    }

    fn attach_host_end(&self, host: &Link, bridge: &Link) -> Result<()> {
        self.links.set_up(host)?;
        self.links.set_master(host, bridge)
    }

    fn attach_container_end(
        &self,
        pid: u32,
        peer_name: &str,
        topology: &NetworkTopology,
    ) -> Result<()> {
        let peer = self.require_link(peer_name)?;
        self.links.set_netns_by_pid(&peer, pid)?;

        self.netns.exec(pid, || {
            self.bring_up_loopback(pid);
            let peer = self.require_link(peer_name)?;
            self.links.replace_address(&peer, topology.container_addr)?;
            self.links.set_up(&peer)
        })
    }

    fn bring_up_loopback(&self, pid: u32) {
        let result = self
            .links
            .find_link("lo")
            .and_then(|lo| lo.map_or(Ok(()), |lo| self.links.set_up(&lo)));
        if let Err(e) = result {
            tracing::debug!(pid, error = %e, "loopback left down");
        }
    }

    /// Deletes the veth pair by its host end, then decides whether `err`
    /// still matters.
    fn abandon(&self, pid: u32, host_name: &str, err: CorralError) -> Result<()> {
        let deleted = self
            .links
            .find_link(host_name)
            .and_then(|host| host.map_or(Ok(()), |host| self.links.delete_link(&host)));
        if let Err(e) = deleted {
            tracing::error!(link = host_name, error = %e, "failed to delete veth pair");
        }
        if (self.is_alive)(pid) {
            return Err(err);
        }
        tracing::warn!(pid, error = %err, "container exited before its network was configured");
        Ok(())
    }

    fn require_link(&self, name: &str) -> Result<Link> {
        self.links
            .find_link(name)?
            .ok_or_else(|| CorralError::network(format!("look up link {name}"), "no such link"))
    }
}
