//! Archive extraction.
//!
//! Supports both plain `.tar` and gzip-compressed `.tar.gz` / `.tgz`
//! archives. Permissions are preserved, since the result is the root
//! filesystem of a container; ownership too when extracting as root.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use corral_common::error::{CorralError, Result};
use nix::unistd::Uid;

/// Unpacks an image archive into a directory.
pub trait ImageExtractor: Send + Sync {
    /// Extracts every entry of `archive` below `dest`, which exists.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::ExtractionFailed`] if the archive cannot be
    /// read or unpacked.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

impl<T: ImageExtractor + ?Sized> ImageExtractor for &T {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        (**self).extract(archive, dest)
    }
}

/// Extracts tar archives, gzip-compressed or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl ImageExtractor for TarExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        tracing::info!(
            archive = %archive.display(),
            dest = %dest.display(),
            "extracting image"
        );
        let failed = |source| CorralError::ExtractionFailed {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
            source,
        };

        let file = File::open(archive).map_err(failed)?;
        if is_gzip_archive(archive) {
            unpack(flate2::read::GzDecoder::new(file), dest).map_err(failed)?;
        } else {
            unpack(file, dest).map_err(failed)?;
        }

        tracing::info!(dest = %dest.display(), "image extracted");
        Ok(())
    }
}

fn unpack(reader: impl Read, dest: &Path) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_ownerships(Uid::effective().is_root());
    archive.set_overwrite(true);
    archive.unpack(dest)
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}
