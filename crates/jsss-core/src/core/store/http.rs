use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::core::fs::persist_named_tempfile;

const USER_AGENT: &str = concat!("jsss/", env!("CARGO_PKG_VERSION"));
const MIN_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

/// Timeout for whole-archive downloads and uploads, which can run far
/// longer than a single probe.
pub(crate) fn transfer_timeout(request_timeout: Duration) -> Duration {
    request_timeout.max(MIN_TRANSFER_TIMEOUT)
}

/// Blocking HTTP backend: HEAD probes, streamed GETs, PUT uploads.
#[derive(Clone, Debug)]
pub struct HttpStore {
    timeout: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum RemoteEntry {
    Missing,
    File,
    Directory,
}

impl HttpStore {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Classifies a URL. A trailing `/` or an HTML listing marks a directory.
    pub(super) fn probe(&self, url: &Url) -> Result<RemoteEntry> {
        let client = http_client(self.timeout)?;
        let response = client
            .head(url.clone())
            .send()
            .with_context(|| format!("failed to probe {url}"))?;
        let response = if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            client
                .get(url.clone())
                .send()
                .with_context(|| format!("failed to probe {url}"))?
        } else {
            response
        };
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(RemoteEntry::Missing);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?;
        if url.path().ends_with('/') || is_html(&response) {
            Ok(RemoteEntry::Directory)
        } else {
            Ok(RemoteEntry::File)
        }
    }

    pub(super) fn download(&self, url: &Url, dest: &Path) -> Result<()> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let client = http_client(transfer_timeout(self.timeout))?;
        let mut response = client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        let (written, sha256) = stream_into(&mut response, &mut tmp)
            .with_context(|| format!("stream error for {url}"))?;
        persist_named_tempfile(tmp, dest)
            .with_context(|| format!("failed to persist {}", dest.display()))?;
        info!(%url, dest = %dest.display(), bytes = written, "downloaded archive");
        debug!(%url, sha256, "archive digest");
        Ok(())
    }

    pub(super) fn upload(&self, src: &Path, url: &Url) -> Result<()> {
        let file = File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
        let len = file.metadata().map(|meta| meta.len()).unwrap_or_default();
        let client = http_client(transfer_timeout(self.timeout))?;
        client
            .put(url.clone())
            .body(file)
            .send()
            .with_context(|| format!("failed to upload to {url}"))?
            .error_for_status()
            .with_context(|| format!("upload rejected by {url}"))?;
        info!(%url, src = %src.display(), bytes = len, "uploaded archive");
        Ok(())
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("text/html"))
}

/// Copies `reader` into `writer` in 64 KiB chunks, returning size and sha256.
pub(crate) fn stream_into(reader: &mut impl Read, writer: &mut impl Write) -> Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;
    let mut buffer = vec![0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        writer.write_all(&buffer[..read])?;
        written += read as u64;
    }
    writer.flush()?;
    Ok((written, hex::encode(hasher.finalize())))
}
