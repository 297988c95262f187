//! Filesystem assembly for container isolation.
//!
//! The root filesystem is built in a fixed order, each step relying on the
//! previous one: overlay, special filesystems, device nodes, then the root
//! pivot. Image extraction happens before any of this and lives in
//! `corral-image`.

pub mod device;
pub mod mount;
pub mod overlayfs;
pub mod pivot_root;

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use corral_common::error::{CorralError, Result};

/// Creates `path` and its parents with `mode` for newly created directories.
pub(crate) fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(|e| CorralError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
