//! Image archive lookup.

use std::path::{Path, PathBuf};

use corral_common::error::{CorralError, Result};

/// Returns the single archive `<images_dir>/<name>.*`.
///
/// Any extension matches, including compound ones such as `.tar.gz`.
///
/// # Errors
///
/// Returns [`CorralError::ImageNotFound`] if nothing matches (or
/// `images_dir` does not exist), [`CorralError::AmbiguousImage`] if
/// several entries match, or [`CorralError::Io`] if the directory cannot
/// be read.
pub fn locate_archive(images_dir: &Path, name: &str) -> Result<PathBuf> {
    let not_found = || CorralError::ImageNotFound {
        image: name.to_string(),
        dir: images_dir.to_path_buf(),
    };
    let io_error = |e| CorralError::Io {
        path: images_dir.to_path_buf(),
        source: e,
    };

    let entries = match std::fs::read_dir(images_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(io_error(e)),
    };

    let prefix = format!("{name}.");
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error)?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(not_found()),
        1 => Ok(matches.remove(0)),
        _ => Err(CorralError::AmbiguousImage {
            image: name.to_string(),
            matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn unique_archive_is_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "alpine.tar.gz");
        touch(dir.path(), "busybox.tar");

        let found = locate_archive(dir.path(), "alpine").unwrap();
        assert_eq!(found, dir.path().join("alpine.tar.gz"));
    }

    #[test]
    fn extracted_directory_and_similar_names_do_not_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("alpine")).unwrap();
        touch(dir.path(), "alpine3.tar");
        touch(dir.path(), "alpine.tar");

        let found = locate_archive(dir.path(), "alpine").unwrap();
        assert_eq!(found, dir.path().join("alpine.tar"));
    }

    #[test]
    fn no_match_is_image_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "alpine.tar");

        let err = locate_archive(dir.path(), "missing").unwrap_err();
        assert!(matches!(err, CorralError::ImageNotFound { ref image, .. } if image == "missing"));
    }

    #[test]
    fn missing_directory_is_image_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_archive(&dir.path().join("nope"), "alpine").unwrap_err();
        assert!(matches!(err, CorralError::ImageNotFound { .. }));
    }

    #[test]
    fn several_matches_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "alpine.tar");
        touch(dir.path(), "alpine.tar.gz");

        let err = locate_archive(dir.path(), "alpine").unwrap_err();
        match err {
            CorralError::AmbiguousImage { matches, .. } => assert_eq!(matches.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
