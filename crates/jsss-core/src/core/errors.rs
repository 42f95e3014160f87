use std::path::PathBuf;

use serde_json::{json, Value};

/// Fatal outcomes of archive/contents resolution and dataset generation.
///
/// A plain miss is never one of these; it is [`crate::Acquisition::Miss`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("{} should be a {expected} or absent, but it is not", path.display())]
    InvalidLocalState { path: PathBuf, expected: &'static str },
    #[error("archive address '{address}' should be a file or absent, but it is a directory")]
    InvalidRemoteState { address: String },
    #[error(
        "failed to acquire contents from '{address}' even after fetching the origin ({reason}). \
         Please open an issue describing the state and contents of this address."
    )]
    OriginAcquisitionFailed { address: String, reason: String },
    #[error("corpus item {} is missing or unreadable: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("archive {} could not be extracted: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },
    #[error("corpus archive '{address}' cannot be acquired; enable corpus download to fetch the origin")]
    CorpusUnavailable { address: String },
    #[error("unsupported storage address '{address}' (use a local path, file://, http:// or https://)")]
    UnsupportedAddress { address: String },
}

impl AcquireError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidLocalState { .. } => "invalid_local_state",
            Self::InvalidRemoteState { .. } => "invalid_remote_state",
            Self::OriginAcquisitionFailed { .. } => "origin_acquisition_failed",
            Self::SourceUnreadable { .. } => "source_unreadable",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::CorpusUnavailable { .. } => "corpus_unavailable",
            Self::UnsupportedAddress { .. } => "unsupported_address",
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidLocalState { .. } => {
                Some("Remove or rename the conflicting path, then retry.")
            }
            Self::InvalidRemoteState { .. } => {
                Some("Point the address at an archive file, not a directory.")
            }
            Self::CorpusUnavailable { .. } => {
                Some("Re-run with --download or set JSSS_DOWNLOAD=1.")
            }
            Self::CorruptArchive { .. } => {
                Some("Delete the broken archive so it can be fetched or regenerated.")
            }
            Self::UnsupportedAddress { .. } => Some("Use a local path or an http(s):// URL."),
            Self::OriginAcquisitionFailed { .. } | Self::SourceUnreadable { .. } => None,
        }
    }

    #[must_use]
    pub fn details(&self) -> Value {
        let mut details = json!({ "reason": self.reason() });
        if let Value::Object(map) = &mut details {
            if let Some(hint) = self.hint() {
                map.insert("hint".into(), json!(hint));
            }
            match self {
                Self::InvalidLocalState { path, .. }
                | Self::SourceUnreadable { path, .. }
                | Self::CorruptArchive { path, .. } => {
                    map.insert("path".into(), json!(path.display().to_string()));
                }
                Self::InvalidRemoteState { address }
                | Self::OriginAcquisitionFailed { address, .. }
                | Self::CorpusUnavailable { address }
                | Self::UnsupportedAddress { address } => {
                    map.insert("address".into(), json!(address));
                }
            }
        }
        details
    }
}

/// Per-item access failures on a materialized dataset.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("index {index} is out of range for a dataset of {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}
