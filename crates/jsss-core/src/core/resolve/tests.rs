use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tempfile::TempDir;

use super::*;
use crate::core::archive::{Archiver, ZipArchiver};
use crate::core::origin::OriginTransfer;
use crate::core::store::ObjectStore;

#[derive(Clone)]
enum Entry {
    File(Vec<u8>),
    Dir,
}

#[derive(Default)]
struct FakeEffects {
    remote: Mutex<HashMap<String, Entry>>,
    origin_payload: Option<Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeEffects {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn with_remote(self, address: &StorageAddress, entry: Entry) -> Self {
        self.remote
            .lock()
            .unwrap()
            .insert(address.to_string(), entry);
        self
    }

    fn with_origin(mut self, payload: Vec<u8>) -> Self {
        self.origin_payload = Some(payload);
        self
    }

    fn remote_file(&self, address: &StorageAddress) -> Option<Vec<u8>> {
        match self.remote.lock().unwrap().get(&address.to_string()) {
            Some(Entry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }
}

impl ObjectStore for FakeEffects {
    fn exists(&self, address: &StorageAddress) -> Result<bool> {
        self.record(format!("exists {address}"));
        Ok(self.remote.lock().unwrap().contains_key(&address.to_string()))
    }

    fn is_file(&self, address: &StorageAddress) -> Result<bool> {
        self.record(format!("is_file {address}"));
        Ok(matches!(
            self.remote.lock().unwrap().get(&address.to_string()),
            Some(Entry::File(_))
        ))
    }

    fn get_file(&self, address: &StorageAddress, dest: &Path) -> Result<()> {
        self.record(format!("get_file {address}"));
        let bytes = self
            .remote_file(address)
            .ok_or_else(|| anyhow!("no file at {address}"))?;
        fs::create_dir_all(dest.parent().unwrap())?;
        fs::write(dest, bytes)?;
        Ok(())
    }

    fn put_file(&self, src: &Path, address: &StorageAddress) -> Result<()> {
        self.record(format!("put_file {address}"));
        let bytes = fs::read(src)?;
        self.remote
            .lock()
            .unwrap()
            .insert(address.to_string(), Entry::File(bytes));
        Ok(())
    }
}

impl OriginTransfer for FakeEffects {
    fn fetch_large_file(&self, origin: &OriginReference, dest: &Path) -> Result<()> {
        self.record(format!("fetch_large_file {}", origin.id));
        let payload = self
            .origin_payload
            .clone()
            .ok_or_else(|| anyhow!("origin unreachable"))?;
        fs::create_dir_all(dest.parent().unwrap())?;
        fs::write(dest, payload)?;
        Ok(())
    }
}

impl Archiver for FakeEffects {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.record("extract");
        ZipArchiver.extract(archive, dest)
    }

    fn compress(&self, source: &Path, archive: &Path) -> Result<()> {
        self.record("compress");
        ZipArchiver.compress(source, archive)
    }
}

impl Effects for FakeEffects {
    fn store(&self) -> &dyn ObjectStore {
        self
    }

    fn origin(&self) -> &dyn OriginTransfer {
        self
    }

    fn archiver(&self) -> &dyn Archiver {
        self
    }
}

fn site(temp: &TempDir) -> ArchiveSite {
    ArchiveSite::local(
        temp.path().join("contents"),
        temp.path().join("archive/key.zip"),
    )
}

fn remote_address() -> StorageAddress {
    StorageAddress::parse("https://store.invalid/datasets/key.zip").unwrap()
}

fn archive_bytes() -> Vec<u8> {
    let temp = tempfile::tempdir().unwrap();
    let tree = temp.path().join("tree");
    fs::create_dir_all(tree.join("jsss_ver1/summarization")).unwrap();
    fs::write(tree.join("jsss_ver1/summarization/marker.txt"), b"ok").unwrap();
    let archive = temp.path().join("tree.zip");
    ZipArchiver.compress(&tree, &archive).unwrap();
    fs::read(archive).unwrap()
}

fn write_local_archive(site: &ArchiveSite, bytes: &[u8]) {
    fs::create_dir_all(site.archive.parent().unwrap()).unwrap();
    fs::write(&site.archive, bytes).unwrap();
}

fn acquire_error(err: &anyhow::Error) -> &AcquireError {
    err.downcast_ref::<AcquireError>()
        .unwrap_or_else(|| panic!("expected AcquireError, got {err:#}"))
}

#[test]
fn existing_contents_short_circuit_without_side_effects() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp).with_remote(Some(remote_address()));
    fs::create_dir_all(&site.contents).unwrap();
    let effects = FakeEffects::default();

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Present);
    assert!(effects.calls().is_empty());
}

#[test]
fn contents_path_that_is_a_file_is_invalid() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    fs::write(&site.contents, b"oops").unwrap();
    let effects = FakeEffects::default();

    let err = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap_err();
    assert_eq!(
        acquire_error(&err),
        &AcquireError::InvalidLocalState {
            path: site.contents.clone(),
            expected: "directory",
        }
    );
}

#[test]
fn local_archive_is_extracted() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp).with_remote(Some(remote_address()));
    write_local_archive(&site, &archive_bytes());
    let effects = FakeEffects::default();

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Extracted);
    assert!(site
        .contents
        .join("jsss_ver1/summarization/marker.txt")
        .is_file());
    assert_eq!(effects.calls(), vec!["extract"]);
}

#[test]
fn archive_path_that_is_a_directory_is_invalid() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    fs::create_dir_all(&site.archive).unwrap();
    let effects = FakeEffects::default();

    let err = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap_err();
    assert_eq!(
        acquire_error(&err),
        &AcquireError::InvalidLocalState {
            path: site.archive.clone(),
            expected: "file",
        }
    );
}

#[test]
fn corrupt_local_archive_is_reported_and_leaves_no_contents() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    write_local_archive(&site, b"not a zip");
    let effects = FakeEffects::default();

    let err = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap_err();
    assert!(matches!(
        acquire_error(&err),
        AcquireError::CorruptArchive { .. }
    ));
    assert!(!site.contents.exists());
}

#[test]
fn remote_directory_is_invalid() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let effects = FakeEffects::default().with_remote(&remote, Entry::Dir);

    let err = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap_err();
    assert_eq!(
        acquire_error(&err),
        &AcquireError::InvalidRemoteState {
            address: remote.to_string()
        }
    );
}

#[test]
fn remote_archive_is_fetched_and_extracted() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let effects = FakeEffects::default().with_remote(&remote, Entry::File(archive_bytes()));

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Fetched);
    assert!(site.archive.is_file());
    assert!(site.contents.is_dir());
    assert_eq!(
        effects.calls(),
        vec![
            format!("exists {remote}"),
            format!("is_file {remote}"),
            format!("get_file {remote}"),
            "extract".to_string(),
        ]
    );
}

#[test]
fn remote_archive_without_download_is_a_miss() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let effects = FakeEffects::default().with_remote(&remote, Entry::File(archive_bytes()));

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, false)
        .unwrap();
    assert_eq!(outcome, Acquisition::Miss);
    assert!(!effects.calls().iter().any(|call| call.starts_with("get_file")));
    assert!(!site.contents.exists());
}

#[test]
fn absent_everywhere_is_a_miss() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp).with_remote(Some(remote_address()));
    let effects = FakeEffects::default();

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Miss);
    assert!(!outcome.is_acquired());
}

#[test]
fn address_equal_to_local_archive_is_not_probed() {
    let temp = tempfile::tempdir().unwrap();
    let base = site(&temp);
    let site = base
        .clone()
        .with_remote(Some(StorageAddress::Local(base.archive.clone())));
    let effects = FakeEffects::default();

    let outcome = ArchiveResolver::new(&effects)
        .try_acquire(&site, true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Miss);
    assert!(effects.calls().is_empty());
}

#[test]
fn origin_fallback_fetches_then_extracts() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    let effects = FakeEffects::default().with_origin(archive_bytes());

    let outcome = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Origin);
    assert!(site.contents.is_dir());
    assert_eq!(effects.calls(), vec!["fetch_large_file origin-id", "extract"]);
}

#[test]
fn origin_fallback_publishes_to_remote_address() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let payload = archive_bytes();
    let effects = FakeEffects::default().with_origin(payload.clone());

    let outcome = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), true)
        .unwrap();
    assert_eq!(outcome, Acquisition::Origin);
    assert_eq!(effects.remote_file(&remote), Some(payload));
}

#[test]
fn corrupt_origin_payload_fails_with_actionable_error() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    let effects = FakeEffects::default().with_origin(b"garbage".to_vec());

    let err = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), true)
        .unwrap_err();
    let typed = acquire_error(&err);
    assert!(matches!(
        typed,
        AcquireError::OriginAcquisitionFailed { address, .. }
            if *address == site.archive.display().to_string()
    ));
    assert!(typed.to_string().contains("open an issue"));
    assert!(!site.contents.exists());
    let fetches = effects
        .calls()
        .iter()
        .filter(|call| call.starts_with("fetch_large_file"))
        .count();
    assert_eq!(fetches, 1, "origin is never retried");
}

#[test]
fn unreachable_origin_fails() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    let effects = FakeEffects::default();

    let err = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), true)
        .unwrap_err();
    assert!(matches!(
        acquire_error(&err),
        AcquireError::OriginAcquisitionFailed { .. }
    ));
}

#[test]
fn origin_is_untouched_without_download() {
    let temp = tempfile::tempdir().unwrap();
    let site = site(&temp);
    let effects = FakeEffects::default().with_origin(archive_bytes());

    let outcome = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), false)
        .unwrap();
    assert_eq!(outcome, Acquisition::Miss);
    assert!(effects.calls().is_empty());
}

#[test]
fn save_packs_then_publishes() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    fs::create_dir_all(site.contents.join("summarization/waves")).unwrap();
    fs::write(site.contents.join("summarization/waves/001.wave.npy"), b"x").unwrap();
    let effects = FakeEffects::default();

    ArchiveResolver::new(&effects).save(&site).unwrap();
    assert!(site.archive.is_file());
    assert_eq!(
        effects.remote_file(&remote),
        Some(fs::read(&site.archive).unwrap())
    );
    assert_eq!(
        effects.calls(),
        vec!["compress".to_string(), format!("put_file {remote}")]
    );
}

#[test]
fn second_resolution_does_no_work() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let effects = FakeEffects::default().with_remote(&remote, Entry::File(archive_bytes()));
    let resolver = ArchiveResolver::new(&effects);

    assert_eq!(resolver.try_acquire(&site, true).unwrap(), Acquisition::Fetched);
    let after_first = effects.calls().len();
    assert_eq!(resolver.try_acquire(&site, true).unwrap(), Acquisition::Present);
    assert_eq!(effects.calls().len(), after_first);
}

#[test]
fn archive_address_is_fetched_even_without_origin_download() {
    let temp = tempfile::tempdir().unwrap();
    let remote = remote_address();
    let site = site(&temp).with_remote(Some(remote.clone()));
    let effects = FakeEffects::default().with_remote(&remote, Entry::File(archive_bytes()));

    let outcome = ArchiveResolver::new(&effects)
        .acquire_with_origin(&site, &OriginReference::new("origin-id", 0.1), false)
        .unwrap();
    assert_eq!(outcome, Acquisition::Fetched);
    assert!(!effects
        .calls()
        .iter()
        .any(|call| call.starts_with("fetch_large_file")));
}
