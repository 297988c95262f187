//! [`LinkManager`] backed by rtnetlink.

use std::future::Future;

use corral_common::error::{CorralError, Result};
use futures::TryStreamExt;
use ipnetwork::IpNetwork;
use netlink_packet_route::rtnl::link::nlas::Nla;
use rtnetlink::Handle;

use super::link::{Link, LinkManager};

/// Talks rtnetlink to the kernel.
///
/// A new netlink socket is opened for every operation, on a current-thread
/// runtime, so the socket always belongs to the network namespace the
/// calling thread is in at that moment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtnetlinkLinkManager;

impl RtnetlinkLinkManager {
    fn run<T, F, Fut>(&self, operation: &str, request: F) -> Result<T>
    where
        F: FnOnce(Handle) -> Fut,
        Fut: Future<Output = std::result::Result<T, rtnetlink::Error>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CorralError::network(operation, e))?;
        runtime.block_on(async {
            let (connection, handle, _) =
                rtnetlink::new_connection().map_err(|e| CorralError::network(operation, e))?;
            let driver = tokio::spawn(connection);
            let result = request(handle).await;
            driver.abort();
            result.map_err(|e| CorralError::network(operation, e))
        })
    }
}

impl LinkManager for RtnetlinkLinkManager {
    fn find_link(&self, name: &str) -> Result<Option<Link>> {
        self.run(&format!("look up link {name}"), |handle| async move {
            let mut links = handle.link().get().execute();
            while let Some(msg) = links.try_next().await? {
                let found = msg
                    .nlas
                    .iter()
                    .any(|nla| matches!(nla, Nla::IfName(n) if n == name));
                if found {
                    return Ok(Some(Link {
                        name: name.to_string(),
                        index: msg.header.index,
                    }));
                }
            }
            Ok(None)
        })
    }

    fn add_bridge(&self, name: &str) -> Result<()> {
        self.run(&format!("add bridge {name}"), |handle| async move {
            handle.link().add().bridge(name.to_string()).execute().await
        })
    }

    fn add_veth_pair(&self, host: &str, peer: &str) -> Result<()> {
        self.run(&format!("add veth {host}"), |handle| async move {
            handle
                .link()
                .add()
                .veth(host.to_string(), peer.to_string())
                .execute()
                .await
        })
    }

    fn set_up(&self, link: &Link) -> Result<()> {
        self.run(&format!("set {} up", link.name), |handle| async move {
            handle.link().set(link.index).up().execute().await
        })
    }

    fn replace_address(&self, link: &Link, address: IpNetwork) -> Result<()> {
        self.run(
            &format!("replace address of {} with {address}", link.name),
            |handle| async move {
                handle
                    .address()
                    .add(link.index, address.ip(), address.prefix())
                    .replace()
                    .execute()
                    .await
            },
        )
    }

    fn set_master(&self, link: &Link, master: &Link) -> Result<()> {
        self.run(
            &format!("set master of {} to {}", link.name, master.name),
            |handle| async move {
                handle
                    .link()
                    .set(link.index)
                    .master(master.index)
                    .execute()
                    .await
            },
        )
    }

    fn set_netns_by_pid(&self, link: &Link, pid: u32) -> Result<()> {
        self.run(
            &format!("move {} to netns of pid {pid}", link.name),
            |handle| async move {
                handle
                    .link()
                    .set(link.index)
                    .setns_by_pid(pid)
                    .execute()
                    .await
            },
        )
    }

    fn delete_link(&self, link: &Link) -> Result<()> {
        self.run(&format!("delete link {}", link.name), |handle| async move {
            handle.link().del(link.index).execute().await
        })
    }
}
