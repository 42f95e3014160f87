use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

use crate::core::errors::AcquireError;

/// Where an archive lives: a local path or a remote URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageAddress {
    Local(PathBuf),
    Remote(Url),
}

impl StorageAddress {
    /// Parses a local path, a `file://` URL, or an `http(s)://` URL.
    ///
    /// # Errors
    /// Returns [`AcquireError::UnsupportedAddress`] for other schemes and a
    /// plain error for empty or malformed input.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("storage address must not be empty");
        }
        if !trimmed.contains("://") {
            return Ok(Self::Local(PathBuf::from(trimmed)));
        }
        let url = Url::parse(trimmed).with_context(|| format!("invalid address '{trimmed}'"))?;
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|()| anyhow!("file address '{trimmed}' has no local path")),
            "http" | "https" => Ok(Self::Remote(url)),
            _ => Err(AcquireError::UnsupportedAddress {
                address: trimmed.to_string(),
            }
            .into()),
        }
    }

    /// Address of `name` inside this address treated as a directory.
    pub fn join(&self, name: &str) -> Result<Self> {
        match self {
            Self::Local(path) => Ok(Self::Local(path.join(name))),
            Self::Remote(url) => {
                let mut base = url.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                let joined = base
                    .join(name)
                    .with_context(|| format!("failed to join '{name}' onto {url}"))?;
                Ok(Self::Remote(joined))
            }
        }
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// True when the address names `path` on the local filesystem.
    #[must_use]
    pub fn is_local_path(&self, path: &Path) -> bool {
        let Some(own) = self.local_path() else {
            return false;
        };
        if own == path {
            return true;
        }
        match (own.canonicalize(), path.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl FromStr for StorageAddress {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<PathBuf> for StorageAddress {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_local() {
        let addr = StorageAddress::parse("./data/archive/x.zip").unwrap();
        assert_eq!(addr, StorageAddress::Local(PathBuf::from("./data/archive/x.zip")));
        assert!(!addr.is_remote());
    }

    #[cfg(unix)]
    #[test]
    fn file_urls_are_local() {
        let addr = StorageAddress::parse("file:///tmp/jsss/x.zip").unwrap();
        assert_eq!(addr, StorageAddress::Local(PathBuf::from("/tmp/jsss/x.zip")));
    }

    #[test]
    fn http_urls_are_remote() {
        let addr = StorageAddress::parse("https://example.invalid/jsss/x.zip").unwrap();
        assert!(addr.is_remote());
        assert_eq!(addr.to_string(), "https://example.invalid/jsss/x.zip");
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        let err = StorageAddress::parse("s3://bucket/x.zip").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AcquireError>(),
            Some(&AcquireError::UnsupportedAddress {
                address: "s3://bucket/x.zip".into()
            })
        );
        assert!(StorageAddress::parse("   ").is_err());
    }

    #[test]
    fn join_treats_address_as_directory() {
        let remote = StorageAddress::parse("https://example.invalid/datasets").unwrap();
        assert_eq!(
            remote.join("abc.zip").unwrap().to_string(),
            "https://example.invalid/datasets/abc.zip"
        );
        let remote = StorageAddress::parse("https://example.invalid/datasets/").unwrap();
        assert_eq!(
            remote.join("abc.zip").unwrap().to_string(),
            "https://example.invalid/datasets/abc.zip"
        );
        let local = StorageAddress::parse("/srv/datasets").unwrap();
        assert_eq!(
            local.join("abc.zip").unwrap(),
            StorageAddress::Local(PathBuf::from("/srv/datasets/abc.zip"))
        );
    }
}
