//! Capture file loading
//!
//! A capture file is a JSON document holding one [`Session`]:
//!
//! ```text
//! {"runs": [{"frames": [{"ms_between_presents": 16.6, "time_in_seconds": 0.0166}],
//!            "power": {"gpu": [{"counter": 10, "value": 210.5}]}}]}
//! ```

use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncReadExt};
use tracing::{error, info};

use crate::session::Session;

/// Errors produced while loading a capture.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The capture file could not be read.
    #[error("Failed to read capture {path:?}: {source}")]
    Read {
        /// Capture path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// JSON deserialization failed.
    #[error(transparent)]
    Deserialize(#[from] serde_json::Error),
}

/// Parse a [`Session`] from capture JSON.
///
/// # Errors
///
/// Function will error if `contents` is not a valid capture.
pub fn from_json(contents: &str) -> Result<Session, Error> {
    Ok(serde_json::from_str(contents)?)
}

/// Read and parse the capture file at `path`.
///
/// # Errors
///
/// Function will error if the file cannot be read or is not a valid capture.
pub async fn load(path: &Path) -> Result<Session, Error> {
    let read_error = |source| Error::Read {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let mut file = fs::File::open(path).await.map_err(read_error)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).await.map_err(read_error)?;

    let session = from_json(&contents).map_err(|err| {
        error!("Capture {} is malformed: {err}", path.display());
        err
    })?;
    info!(
        runs = session.runs.len(),
        frames = session.frame_count(),
        "loaded capture {}",
        path.display()
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const CAPTURE: &str = r#"{
        "runs": [
            {
                "frames": [
                    {"ms_between_presents": 10.0, "time_in_seconds": 0.01, "counter": 100},
                    {"ms_between_presents": 20.0, "time_in_seconds": 0.03, "counter": 300,
                     "dropped": true, "ms_between_display_change": 20.0}
                ],
                "power": {"gpu": [{"counter": 0, "value": 150.0}, {"counter": 400, "value": 170.0}]}
            },
            {"frames": [{"ms_between_presents": 30.0, "time_in_seconds": 0.03}]}
        ]
    }"#;

    #[test]
    fn parses_capture() {
        let session = from_json(CAPTURE).expect("valid capture");
        assert_eq!(session.runs.len(), 2);
        assert_eq!(session.frametimes(), vec![10.0, 20.0, 30.0]);
        assert!(session.runs[0].frames[1].dropped);
        assert_eq!(session.runs[0].power["gpu"].len(), 2);
        assert!(session.runs[1].power.is_empty());
        assert_eq!(session.runs[1].frames[0].counter, None);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = from_json(r#"{"runs": [], "extra": 1}"#);
        assert!(matches!(result, Err(Error::Deserialize(_))));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CAPTURE.as_bytes()).expect("write capture");
        let session = load(file.path()).await.expect("valid capture");
        assert_eq!(session.frame_count(), 3);

        let missing = load(Path::new("/nonexistent/capture.json")).await;
        assert!(matches!(missing, Err(Error::Read { .. })));
    }
}
