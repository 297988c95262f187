//! Extraction cache of images.
//!
//! `<images_dir>/<name>` is trusted as soon as it exists: it is never
//! re-verified or invalidated. Extraction therefore goes to a private
//! staging directory that is renamed into place only once complete, so an
//! interrupted extraction never leaves a partial tree behind under the
//! cached name. Two launches extracting the same image at once both do
//! the work; the first rename wins and the other copy is discarded.

use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use corral_common::error::{CorralError, Result};

use crate::archive::locate_archive;
use crate::extract::ImageExtractor;

/// Where the root filesystem of an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Already extracted at this path.
    Cached(PathBuf),
    /// Must be extracted from this archive.
    Archive(PathBuf),
}

/// Images stored below one directory.
#[derive(Debug)]
pub struct ImageStore<E> {
    images_dir: PathBuf,
    extractor: E,
}

impl<E: ImageExtractor> ImageStore<E> {
    /// Opens the store rooted at `images_dir`.
    pub fn new(images_dir: impl Into<PathBuf>, extractor: E) -> Self {
        Self {
            images_dir: images_dir.into(),
            extractor,
        }
    }

    /// Returns the extraction cache path of image `name`.
    pub fn extracted_path(&self, name: &str) -> PathBuf {
        self.images_dir.join(name)
    }

    /// Resolves image `name` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::ImageNotFound`] or
    /// [`CorralError::AmbiguousImage`] if the image is not cached and its
    /// archive cannot be located unambiguously.
    pub fn resolve(&self, name: &str) -> Result<ImageSource> {
        let extracted = self.extracted_path(name);
        if extracted.exists() {
            return Ok(ImageSource::Cached(extracted));
        }
        locate_archive(&self.images_dir, name).map(ImageSource::Archive)
    }

    /// Returns the extracted root filesystem of `name`, extracting it
    /// first if it is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be located or extracted.
    pub fn ensure_extracted(&self, name: &str) -> Result<PathBuf> {
        let archive = match self.resolve(name)? {
            ImageSource::Cached(path) => {
                tracing::debug!(image = name, path = %path.display(), "image already extracted");
                return Ok(path);
            }
            ImageSource::Archive(archive) => archive,
        };

        let target = self.extracted_path(name);
        let staging = self
            .images_dir
            .join(format!(".{name}.partial-{}", uuid::Uuid::new_v4()));
        std::fs::DirBuilder::new()
            .mode(0o755)
            .create(&staging)
            .map_err(|e| CorralError::Io {
                path: staging.clone(),
                source: e,
            })?;

        if let Err(err) = self.extractor.extract(&archive, &staging) {
            discard(&staging);
            return Err(err);
        }
        self.publish(&staging, &target, &archive)?;
        tracing::info!(image = name, path = %target.display(), "image cached");
        Ok(target)
    }

    fn publish(&self, staging: &Path, target: &Path, archive: &Path) -> Result<()> {
        match std::fs::rename(staging, target) {
            Ok(()) => Ok(()),
            Err(_) if target.exists() => {
                tracing::debug!(path = %target.display(), "image extracted concurrently");
                discard(staging);
                Ok(())
            }
            Err(e) => {
                discard(staging);
                Err(CorralError::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    dest: target.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

fn discard(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
    }
}
