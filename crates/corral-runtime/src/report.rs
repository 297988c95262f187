//! Setup failure reports sent from the container process to the host.
//!
//! The host keeps the read end of a close-on-exec pipe. The child writes at
//! most one JSON [`SetupReport`] to the write end before exiting; a
//! successful final exec closes it silently. An empty read therefore means
//! the user command is running.

use std::io::{Read, Write};

use corral_common::error::{CorralError, Result, SetupReport};

/// Writes `err` as a report. Failures are only logged: the child is about
/// to exit with a setup failure status either way.
pub fn send(mut writer: impl Write, err: &CorralError) {
    let report = SetupReport::from(err);
    let written = serde_json::to_vec(&report)
        .map_err(std::io::Error::from)
        .and_then(|bytes| writer.write_all(&bytes));
    if let Err(e) = written {
        tracing::error!(error = %e, "failed to report setup failure to host");
    }
}

/// Reads the report from `reader` until end of file.
///
/// # Errors
///
/// Returns [`CorralError::SpawnFailed`] if the pipe cannot be read, or
/// [`CorralError::Serialization`] if the report is malformed.
pub fn receive(mut reader: impl Read) -> Result<Option<SetupReport>> {
    let mut buf = String::new();
    let _ = reader
        .read_to_string(&mut buf)
        .map_err(|e| CorralError::SpawnFailed { source: e })?;
    if buf.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&buf)?))
}

#[cfg(test)]
mod tests {
    use corral_common::error::ErrorKind;

    use super::*;

    #[test]
    fn report_crosses_the_pipe() {
        let mut pipe = Vec::new();
        let err = CorralError::CgroupSetupFailed {
            path: "/sys/fs/cgroup/cpu/corral/x".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };

        send(&mut pipe, &err);
        let report = receive(pipe.as_slice()).unwrap().unwrap();

        assert_eq!(report.kind, ErrorKind::CgroupSetupFailed);
        assert!(report.message.contains("/sys/fs/cgroup/cpu/corral/x"));
    }

    #[test]
    fn closed_pipe_means_no_failure() {
        assert_eq!(receive(std::io::empty()).unwrap(), None);
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let err = receive(&b"{not json"[..]).unwrap_err();
        assert!(matches!(err, CorralError::Serialization { .. }));
    }
}
