//! Host side of a container launch.

use std::thread;

use corral_common::config::CorralConfig;
use corral_common::error::{CorralError, Result, SetupReport};
use corral_common::types::ContainerId;
use corral_core::namespace::NamespaceConfig;
use corral_core::network::NetworkConfigurator;
use corral_image::{ImageSource, ImageStore, TarExtractor};

use crate::init::InitPayload;
use crate::process;
use crate::request::LaunchRequest;

/// Launches containers and waits for them.
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    config: CorralConfig,
}

impl Launcher {
    /// Creates a launcher for a host configured by `config`.
    #[must_use]
    pub fn new(config: CorralConfig) -> Self {
        Self { config }
    }

    /// Runs `request` to completion and returns the command's exit status.
    ///
    /// The request and image are checked before anything is created. The
    /// network is configured from a separate thread while the container
    /// sets itself up. A network failure does not stop the container: it is
    /// reported once the container has exited.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::InvalidRequest`], [`CorralError::ImageNotFound`]
    /// or [`CorralError::AmbiguousImage`] before any side effect,
    /// [`CorralError::ContainerSetup`] if the container failed to set
    /// itself up, or [`CorralError::NetworkSetupFailed`] if its network
    /// could not be configured.
    pub fn launch(&self, request: &LaunchRequest) -> Result<i32> {
        request.validate()?;
        let topology = request.topology(&self.config.bridge_name)?;

        let id = ContainerId::generate();
        let _span = tracing::info_span!("launch", %id, image = %request.image_name).entered();

        match ImageStore::new(&request.images_dir, TarExtractor).resolve(&request.image_name)? {
            ImageSource::Cached(path) => tracing::debug!(path = %path.display(), "image cached"),
            ImageSource::Archive(path) => tracing::debug!(path = %path.display(), "image archive found"),
        }

        let payload = serde_json::to_string(&InitPayload {
            id: id.clone(),
            request: request.clone(),
            config: self.config.clone(),
        })?;
        let child = process::spawn_init(&payload, &NamespaceConfig::default())?;
        let pid = u32::try_from(child.pid.as_raw()).map_err(|e| CorralError::SpawnFailed {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let (report, status, network) = thread::scope(|scope| {
            let network = scope.spawn(|| {
                let result = NetworkConfigurator::system().configure(pid, &topology);
                if let Err(e) = &result {
                    tracing::error!(pid, error = %e, "container network setup failed");
                }
                result
            });
            let report = crate::report::receive(&child.reports);
            let status = process::wait(child.pid);
            let network = network.join().unwrap_or_else(|_| {
                Err(CorralError::network(
                    format!("configure network of pid {pid}"),
                    "network worker panicked",
                ))
            });
            (report, status, network)
        });

        let status = outcome(report, status, network)?;
        tracing::info!(pid, status, "container exited");
        Ok(status)
    }
}

/// Folds the three results of a launch into one.
///
/// A setup report wins, then a failed wait, then a failed network, then
/// the command's status.
fn outcome(
    report: Result<Option<SetupReport>>,
    status: Result<i32>,
    network: Result<()>,
) -> Result<i32> {
    if let Some(report) = report? {
        if let Err(e) = status {
            tracing::error!(error = %e, "failed to reap container after setup failure");
        }
        if let Err(e) = network {
            tracing::debug!(error = %e, "network error superseded by setup failure");
        }
        return Err(CorralError::ContainerSetup(report));
    }
    let status = status?;
    network?;
    Ok(status)
}
