use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::core::archive::{Archiver, ZipArchiver};
use crate::core::origin::{GoogleDriveTransfer, OriginTransfer};
use crate::core::store::{ObjectStore, SystemObjectStore};

/// Side-effect capabilities the resolution engine runs against.
pub trait Effects: Send + Sync {
    fn store(&self) -> &dyn ObjectStore;
    fn origin(&self) -> &dyn OriginTransfer;
    fn archiver(&self) -> &dyn Archiver;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    store: Arc<dyn ObjectStore>,
    origin: Arc<dyn OriginTransfer>,
    archiver: Arc<dyn Archiver>,
}

impl SystemEffects {
    pub fn new(http_timeout: Duration) -> Result<Self> {
        Ok(Self {
            store: Arc::new(SystemObjectStore::new(http_timeout)),
            origin: Arc::new(GoogleDriveTransfer::new(http_timeout)?),
            archiver: Arc::new(ZipArchiver),
        })
    }

    pub fn shared(http_timeout: Duration) -> Result<SharedEffects> {
        Ok(Arc::new(Self::new(http_timeout)?))
    }
}

impl Effects for SystemEffects {
    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn origin(&self) -> &dyn OriginTransfer {
        self.origin.as_ref()
    }

    fn archiver(&self) -> &dyn Archiver {
        self.archiver.as_ref()
    }
}
