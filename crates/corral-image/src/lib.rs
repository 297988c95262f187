//! # corral-image
//!
//! Image handling for the corral runtime.
//!
//! An image is a root filesystem archive `<images_dir>/<name>.<ext>`. It is
//! extracted once into `<images_dir>/<name>`, and that directory is shared
//! read-only by every container built from the image.
//!
//! - **Archive**: locating the unique archive of an image name.
//! - **Extract**: the [`extract::ImageExtractor`] seam and its tar/gzip
//!   implementation.
//! - **Store**: the extraction cache.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod archive;
pub mod extract;
pub mod store;

pub use extract::{ImageExtractor, TarExtractor};
pub use store::{ImageSource, ImageStore};
