//! Storage backends for archives: local filesystem and HTTP(S).

mod address;
mod http;
mod local;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

pub use address::StorageAddress;
pub use http::HttpStore;
pub(crate) use http::{http_client, stream_into, transfer_timeout};

use http::RemoteEntry;

/// File-level operations on a [`StorageAddress`].
pub trait ObjectStore: Send + Sync {
    fn exists(&self, address: &StorageAddress) -> Result<bool>;
    fn is_file(&self, address: &StorageAddress) -> Result<bool>;
    /// Copies the file at `address` to the local path `dest`.
    fn get_file(&self, address: &StorageAddress, dest: &Path) -> Result<()>;
    /// Copies the local file `src` to `address`.
    fn put_file(&self, src: &Path, address: &StorageAddress) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct SystemObjectStore {
    http: HttpStore,
}

impl SystemObjectStore {
    #[must_use]
    pub fn new(http_timeout: Duration) -> Self {
        Self {
            http: HttpStore::new(http_timeout),
        }
    }
}

impl ObjectStore for SystemObjectStore {
    fn exists(&self, address: &StorageAddress) -> Result<bool> {
        match address {
            StorageAddress::Local(path) => Ok(local::exists(path)),
            StorageAddress::Remote(url) => Ok(self.http.probe(url)? != RemoteEntry::Missing),
        }
    }

    fn is_file(&self, address: &StorageAddress) -> Result<bool> {
        match address {
            StorageAddress::Local(path) => Ok(local::is_file(path)),
            StorageAddress::Remote(url) => Ok(self.http.probe(url)? == RemoteEntry::File),
        }
    }

    fn get_file(&self, address: &StorageAddress, dest: &Path) -> Result<()> {
        match address {
            StorageAddress::Local(path) => local::copy_file(path, dest),
            StorageAddress::Remote(url) => self.http.download(url, dest),
        }
    }

    fn put_file(&self, src: &Path, address: &StorageAddress) -> Result<()> {
        match address {
            StorageAddress::Local(path) => local::copy_file(src, path),
            StorageAddress::Remote(url) => self.http.upload(src, url),
        }
    }
}
