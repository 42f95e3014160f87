use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use tempfile::NamedTempFile;
use tracing::{info, warn};
use url::Url;

use crate::core::fs::persist_named_tempfile;
use crate::core::store::{http_client, stream_into, transfer_timeout};

const DRIVE_DOWNLOAD_ENDPOINT: &str = "https://drive.usercontent.google.com/download";

/// Large-file id plus an approximate size used only for user-facing notices.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginReference {
    pub id: String,
    pub size_gb: f64,
}

impl OriginReference {
    pub fn new(id: impl Into<String>, size_gb: f64) -> Self {
        Self {
            id: id.into(),
            size_gb,
        }
    }

    /// Official `jsss_ver1.zip` distribution.
    #[must_use]
    pub fn jsss_ver1() -> Self {
        Self::new("1NyiZCXkYTdYBNtD1B-IMAYCVa-0SQsKX", 1.01)
    }
}

/// Bulk transfer of an origin distribution to a local file.
pub trait OriginTransfer: Send + Sync {
    fn fetch_large_file(&self, origin: &OriginReference, dest: &Path) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct GoogleDriveTransfer {
    endpoint: Url,
    timeout: Duration,
}

impl GoogleDriveTransfer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(DRIVE_DOWNLOAD_ENDPOINT)?;
        Ok(Self::with_endpoint(endpoint, timeout))
    }

    #[must_use]
    pub fn with_endpoint(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    fn download_url(&self, origin: &OriginReference) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", &origin.id)
            .append_pair("export", "download")
            .append_pair("confirm", "t");
        url
    }
}

impl OriginTransfer for GoogleDriveTransfer {
    fn fetch_large_file(&self, origin: &OriginReference, dest: &Path) -> Result<()> {
        warn!(
            id = %origin.id,
            size_gb = origin.size_gb,
            "downloading the corpus origin (about {:.2} GB); this can take a while",
            origin.size_gb
        );
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let url = self.download_url(origin);
        let client = http_client(transfer_timeout(self.timeout))?;
        let mut response = client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to fetch origin {}", origin.id))?
            .error_for_status()
            .with_context(|| format!("unexpected response for origin {}", origin.id))?;
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        if is_html {
            bail!(
                "Google Drive returned a web page instead of file {} (quota exceeded or access denied)",
                origin.id
            );
        }

        let mut tmp = NamedTempFile::new_in(parent)?;
        let (written, sha256) = stream_into(&mut response, &mut tmp)
            .with_context(|| format!("stream error for origin {}", origin.id))?;
        persist_named_tempfile(tmp, dest)
            .with_context(|| format!("failed to persist {}", dest.display()))?;
        info!(
            id = %origin.id,
            dest = %dest.display(),
            bytes = written,
            sha256,
            "fetched origin"
        );
        Ok(())
    }
}
