//! Deterministic file locations for corpus items and derived artifacts.
//!
//! Everything here is a pure function of `(root, identity, table)`; nothing
//! touches the filesystem.

use std::path::{Path, PathBuf};

use crate::identity::{ItemIdentity, Subtype, SubtypeTable};

pub const RAW_AUDIO_DIR: &str = "wav24kHz16bit";
pub const WAVES_DIR: &str = "waves";
pub const SPECS_DIR: &str = "specs";
pub const TENSOR_EXTENSION: &str = "npy";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Raw,
    Waveform,
    Spectrogram,
}

fn subtype_dir(root: &Path, subtype: Subtype) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in subtype.as_str().split('/') {
        path.push(part);
    }
    path
}

/// `<root>/jsss_<V>/<S>/wav24kHz16bit/<P>_<n:Z>.wav`
#[must_use]
pub fn item_raw_path(root: &Path, table: &SubtypeTable, id: ItemIdentity) -> PathBuf {
    let spec = table.spec(id.subtype);
    subtype_dir(&root.join(table.version().corpus_name()), id.subtype)
        .join(RAW_AUDIO_DIR)
        .join(format!("{}_{}.wav", spec.prefix, spec.padded(id.serial)))
}

/// `<root>/<S>/waves/<n:Z>.wave.npy`
#[must_use]
pub fn item_waveform_path(root: &Path, table: &SubtypeTable, id: ItemIdentity) -> PathBuf {
    subtype_dir(root, id.subtype).join(WAVES_DIR).join(format!(
        "{}.wave.{TENSOR_EXTENSION}",
        table.padded_serial(id)
    ))
}

/// `<root>/<S>/specs/<n:Z>.spec.npy`
#[must_use]
pub fn item_spectrogram_path(root: &Path, table: &SubtypeTable, id: ItemIdentity) -> PathBuf {
    subtype_dir(root, id.subtype).join(SPECS_DIR).join(format!(
        "{}.spec.{TENSOR_EXTENSION}",
        table.padded_serial(id)
    ))
}

#[must_use]
pub fn item_path(
    kind: ArtifactKind,
    root: &Path,
    table: &SubtypeTable,
    id: ItemIdentity,
) -> PathBuf {
    match kind {
        ArtifactKind::Raw => item_raw_path(root, table, id),
        ArtifactKind::Waveform => item_waveform_path(root, table, id),
        ArtifactKind::Spectrogram => item_spectrogram_path(root, table, id),
    }
}
