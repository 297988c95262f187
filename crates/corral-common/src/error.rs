//! Unified error types for the corral workspace.
//!
//! Every fallible step of a launch maps onto one [`ErrorKind`]. Nothing is
//! retried or rolled back locally: an error aborts the current launch and is
//! surfaced with the operation, the resource and the OS error.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CorralError {
    /// The launch request was rejected before any privileged action.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the rejected input.
        message: String,
    },

    /// No archive matches the image name.
    #[error("unable to locate image {image} in {dir}")]
    ImageNotFound {
        /// Requested image name.
        image: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// More than one archive matches the image name.
    #[error("ambiguous image {image}; multiple images match: {matches:?}")]
    AmbiguousImage {
        /// Requested image name.
        image: String,
        /// Every matching archive.
        matches: Vec<PathBuf>,
    },

    /// An image archive could not be extracted.
    #[error("error extracting {archive} into {dest}: {source}")]
    ExtractionFailed {
        /// Archive being extracted.
        archive: PathBuf,
        /// Extraction target.
        dest: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An overlay, special-filesystem, propagation or bind mount failed.
    #[error("error mounting {fstype} at {target}: {source}")]
    MountFailed {
        /// Mount point.
        target: PathBuf,
        /// Filesystem type, or `bind`/`propagation` for flag-only mounts.
        fstype: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A device node, device symlink or console file could not be created.
    #[error("error creating device {path}: {source}")]
    DeviceCreationFailed {
        /// Path of the device entry.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// One of the root pivot steps failed.
    #[error("error changing root file system ({step}): {source}")]
    PivotFailed {
        /// Pivot step that failed.
        step: &'static str,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A cgroup directory or control file could not be written.
    #[error("error writing cgroup {path}: {source}")]
    CgroupSetupFailed {
        /// Cgroup directory or file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A link lookup, creation, address or namespace operation failed.
    #[error("network setup failed ({operation}): {message}")]
    NetworkSetupFailed {
        /// Operation that failed, including the link name.
        operation: String,
        /// Underlying error rendered as text.
        message: String,
    },

    /// Hostname or environment configuration failed.
    #[error("environment setup failed: {message}")]
    EnvironmentSetupFailed {
        /// Description of the failure.
        message: String,
    },

    /// The container process could not be created.
    #[error("error spawning container process: {source}")]
    SpawnFailed {
        /// Underlying error.
        source: std::io::Error,
    },

    /// Replacing the process image with the user command failed.
    #[error("error exec'ing {program}: {source}")]
    ExecFailed {
        /// Program that was executed.
        program: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The container process reported a setup failure before its exec.
    #[error("container setup failed: {0}")]
    ContainerSetup(SetupReport),

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl CorralError {
    /// Returns the taxonomy category of this error.
    ///
    /// A failure reported by the container process keeps the category the
    /// child assigned to it.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::ImageNotFound { .. } => ErrorKind::ImageNotFound,
            Self::AmbiguousImage { .. } => ErrorKind::AmbiguousImage,
            Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::MountFailed { .. } => ErrorKind::MountFailed,
            Self::DeviceCreationFailed { .. } => ErrorKind::DeviceCreationFailed,
            Self::PivotFailed { .. } => ErrorKind::PivotFailed,
            Self::CgroupSetupFailed { .. } => ErrorKind::CgroupSetupFailed,
            Self::NetworkSetupFailed { .. } => ErrorKind::NetworkSetupFailed,
            Self::EnvironmentSetupFailed { .. } => ErrorKind::EnvironmentSetupFailed,
            Self::SpawnFailed { .. } => ErrorKind::SpawnFailed,
            Self::ExecFailed { .. } => ErrorKind::ExecFailed,
            Self::ContainerSetup(report) => report.kind,
            Self::Io { .. } | Self::Serialization { .. } => ErrorKind::Io,
        }
    }

    /// Shorthand for an [`CorralError::InvalidRequest`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Shorthand for a [`CorralError::NetworkSetupFailed`].
    pub fn network(operation: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::NetworkSetupFailed {
            operation: operation.into(),
            message: err.to_string(),
        }
    }
}

/// Category of a launch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad flags or arguments.
    InvalidRequest,
    /// No archive matches the image name.
    ImageNotFound,
    /// Several archives match the image name.
    AmbiguousImage,
    /// Archive extraction failed.
    ExtractionFailed,
    /// A mount failed.
    MountFailed,
    /// Device synthesis failed.
    DeviceCreationFailed,
    /// Root pivot failed.
    PivotFailed,
    /// Cgroup installation failed.
    CgroupSetupFailed,
    /// Network configuration failed.
    NetworkSetupFailed,
    /// Hostname or environment configuration failed.
    EnvironmentSetupFailed,
    /// The container process could not be spawned.
    SpawnFailed,
    /// The final exec failed.
    ExecFailed,
    /// Any other I/O failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failure description sent from the container process to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupReport {
    /// Category of the failure.
    pub kind: ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl From<&CorralError> for SetupReport {
    fn from(err: &CorralError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for SetupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CorralError>;
