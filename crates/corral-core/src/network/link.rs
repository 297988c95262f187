//! Link operations needed to wire a container to the host bridge.

use corral_common::error::Result;
use ipnetwork::IpNetwork;

/// A network interface in the namespace the manager operates in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Interface name.
    pub name: String,
    /// Kernel interface index.
    pub index: u32,
}

/// Creates, looks up and configures network links.
///
/// Every call acts on the calling thread's current network namespace, so
/// the same manager serves both the host side and, inside a namespace
/// switch, the container side.
pub trait LinkManager: Send + Sync {
    /// Returns the link named `name`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the links cannot be listed.
    fn find_link(&self, name: &str) -> Result<Option<Link>>;

    /// Creates a bridge named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge cannot be created.
    fn add_bridge(&self, name: &str) -> Result<()>;

    /// Creates a veth pair `host` <-> `peer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be created.
    fn add_veth_pair(&self, host: &str, peer: &str) -> Result<()>;

    /// Brings `link` administratively up.
    ///
    /// # Errors
    ///
    /// Returns an error if the link state cannot be changed.
    fn set_up(&self, link: &Link) -> Result<()>;

    /// Assigns `address` to `link`, replacing a matching existing
    /// assignment instead of failing on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be assigned.
    fn replace_address(&self, link: &Link, address: IpNetwork) -> Result<()>;

    /// Enslaves `link` to `master`.
    ///
    /// # Errors
    ///
    /// Returns an error if the master cannot be set.
    fn set_master(&self, link: &Link, master: &Link) -> Result<()>;

    /// Moves `link` into the network namespace of process `pid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process is gone or the move fails.
    fn set_netns_by_pid(&self, link: &Link, pid: u32) -> Result<()>;

    /// Deletes `link`. Deleting one end of a veth pair removes both.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be deleted.
    fn delete_link(&self, link: &Link) -> Result<()>;
}
