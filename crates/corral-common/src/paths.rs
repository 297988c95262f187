//! On-disk layout of images and containers.
//!
//! ```text
//! <images_dir>/<image>.<ext>            source archive
//! <images_dir>/<image>/                 extracted image, shared by every container
//! <containers_dir>/<id>/rootfs/         overlay upper layer and mount point
//! <containers_dir>/<id>/workdir/        overlay work area
//! ```

use std::path::{Path, PathBuf};

use crate::constants::{ROOTFS_DIR_NAME, WORKDIR_DIR_NAME};
use crate::types::ContainerId;

/// Paths derived from the container and image directories and an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPaths {
    images_dir: PathBuf,
    image_name: String,
    container_dir: PathBuf,
}

impl ContainerPaths {
    /// Derives the layout for one container launched from `image_name`.
    #[must_use]
    pub fn new(
        containers_dir: &Path,
        images_dir: &Path,
        image_name: &str,
        id: &ContainerId,
    ) -> Self {
        Self {
            images_dir: images_dir.to_path_buf(),
            image_name: image_name.to_string(),
            container_dir: containers_dir.join(id.as_str()),
        }
    }

    /// Directory searched for the image archive.
    #[must_use]
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Name of the image the container is built from.
    #[must_use]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Extraction cache of the image, keyed by image name only.
    #[must_use]
    pub fn image_extracted(&self) -> PathBuf {
        self.images_dir.join(&self.image_name)
    }

    /// Overlay upper layer, which is also the container's root mount point.
    #[must_use]
    pub fn container_root(&self) -> PathBuf {
        self.container_dir.join(ROOTFS_DIR_NAME)
    }

    /// Overlay work area.
    #[must_use]
    pub fn container_workdir(&self) -> PathBuf {
        self.container_dir.join(WORKDIR_DIR_NAME)
    }
}
