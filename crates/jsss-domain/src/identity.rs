use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Sub-corpora shipped in the JSSS distribution, in canonical order.
///
/// The declaration order is load-bearing: identity enumeration, cache keys and
/// dataset indexing all walk subtypes in this order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum Subtype {
    #[strum(serialize = "short-form/basic5000")]
    #[serde(rename = "short-form/basic5000")]
    Basic5000,
    #[strum(serialize = "short-form/onomatopee300")]
    #[serde(rename = "short-form/onomatopee300")]
    Onomatopee300,
    #[strum(serialize = "short-form/voiceactress100")]
    #[serde(rename = "short-form/voiceactress100")]
    VoiceActress100,
    #[strum(serialize = "long-form/katsura-masakazu")]
    #[serde(rename = "long-form/katsura-masakazu")]
    KatsuraMasakazu,
    #[strum(serialize = "long-form/udon")]
    #[serde(rename = "long-form/udon")]
    Udon,
    #[strum(serialize = "long-form/washington-dc")]
    #[serde(rename = "long-form/washington-dc")]
    WashingtonDc,
    #[strum(serialize = "simplification")]
    #[serde(rename = "simplification")]
    Simplification,
    #[strum(serialize = "summarization")]
    #[serde(rename = "summarization")]
    Summarization,
}

pub const SUBTYPE_COUNT: usize = 8;

impl Subtype {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Every subtype in canonical order.
    pub fn all() -> impl Iterator<Item = Subtype> {
        Subtype::iter()
    }

    #[must_use]
    pub fn is_long_form(self) -> bool {
        matches!(
            self,
            Subtype::KatsuraMasakazu | Subtype::Udon | Subtype::WashingtonDc
        )
    }
}

/// One corpus utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub subtype: Subtype,
    pub serial: u32,
}

impl ItemIdentity {
    #[must_use]
    pub const fn new(subtype: Subtype, serial: u32) -> Self {
        Self { subtype, serial }
    }

    /// Label attached to dataset items, e.g. `short-form/basic5000-12`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{}", self.subtype, self.serial)
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.subtype, self.serial)
    }
}

/// Published corpus versions. The version selects the subtype table and the
/// first-level directory name inside the corpus archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorpusVersion {
    #[default]
    #[serde(rename = "ver1")]
    Ver1,
}

impl CorpusVersion {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            CorpusVersion::Ver1 => "ver1",
        }
    }

    /// Top-level directory of the original archive, e.g. `jsss_ver1`.
    #[must_use]
    pub fn corpus_name(self) -> String {
        format!("jsss_{}", self.tag())
    }
}

/// Static description of one subtype's file naming and numbering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtypeSpec {
    pub subtype: Subtype,
    pub prefix: &'static str,
    pub pad: usize,
    pub first: u32,
    pub last: u32,
    /// Serials inside `first..=last` that the distribution does not contain.
    pub excluded: Cow<'static, [u32]>,
}

impl SubtypeSpec {
    #[must_use]
    pub fn contains(&self, serial: u32) -> bool {
        (self.first..=self.last).contains(&serial) && !self.excluded.contains(&serial)
    }

    pub fn serials(&self) -> impl Iterator<Item = u32> + '_ {
        (self.first..=self.last).filter(move |serial| !self.excluded.contains(serial))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize - self.excluded.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn padded(&self, serial: u32) -> String {
        format!("{serial:0width$}", width = self.pad)
    }

    /// Canonical encoding of everything that decides which files are read
    /// and written for this subtype.
    #[must_use]
    pub fn layout(&self) -> String {
        let excluded: Vec<String> = self.excluded.iter().map(u32::to_string).collect();
        format!(
            "{}:{}:pad={}:range={}..={}:excluded={}",
            self.subtype,
            self.prefix,
            self.pad,
            self.first,
            self.last,
            excluded.join(",")
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("subtype table slot {slot} holds '{found}' (expected '{expected}')")]
    Misplaced {
        slot: usize,
        expected: Subtype,
        found: Subtype,
    },
    #[error("subtype '{subtype}' has an empty serial range {first}..={last}")]
    EmptyRange {
        subtype: Subtype,
        first: u32,
        last: u32,
    },
    #[error("subtype '{subtype}' excludes serial {serial} outside its range")]
    ExclusionOutOfRange { subtype: Subtype, serial: u32 },
    #[error("subtype '{subtype}' lists excluded serial {serial} more than once")]
    DuplicateExclusion { subtype: Subtype, serial: u32 },
    #[error("subtype '{subtype}' needs a zero-pad width of at least 1")]
    ZeroPad { subtype: Subtype },
}

// Default BASIC5000 gaps. Not yet checked against a real ver1 archive;
// override with `[exclude]` in the config file.
const BASIC5000_MISSING: &[u32] = &[
    147, 213, 288, 359, 402, 466, 521, 587, 634, 702, 768, 815, 879, 943, 1006, 1071, 1138, 1194,
    1257, 1322, 1389, 1446, 1510, 1577, 1633, 1698, 1764, 1829, 1885, 1952, 2017, 2083, 2146,
    2211, 2279, 2334, 2398, 2463, 2529, 2592, 2658, 2724, 2791,
];

const ONOMATOPEE300_MISSING: &[u32] = &[77];

const VER1_SPECS: [SubtypeSpec; SUBTYPE_COUNT] = [
    SubtypeSpec {
        subtype: Subtype::Basic5000,
        prefix: "BASIC5000",
        pad: 4,
        first: 1,
        last: 3000,
        excluded: Cow::Borrowed(BASIC5000_MISSING),
    },
    SubtypeSpec {
        subtype: Subtype::Onomatopee300,
        prefix: "ONOMATOPEE300",
        pad: 3,
        first: 1,
        last: 185,
        excluded: Cow::Borrowed(ONOMATOPEE300_MISSING),
    },
    SubtypeSpec {
        subtype: Subtype::VoiceActress100,
        prefix: "VOICEACTRESS100",
        pad: 3,
        first: 1,
        last: 100,
        excluded: Cow::Borrowed(&[]),
    },
    SubtypeSpec {
        subtype: Subtype::KatsuraMasakazu,
        prefix: "KATSURA-MASAKAZU",
        pad: 2,
        first: 1,
        last: 59,
        excluded: Cow::Borrowed(&[]),
    },
    SubtypeSpec {
        subtype: Subtype::Udon,
        prefix: "UDON",
        pad: 2,
        first: 1,
        last: 86,
        excluded: Cow::Borrowed(&[]),
    },
    SubtypeSpec {
        subtype: Subtype::WashingtonDc,
        prefix: "WASHINGTON-DC",
        pad: 2,
        first: 1,
        last: 23,
        excluded: Cow::Borrowed(&[]),
    },
    SubtypeSpec {
        subtype: Subtype::Simplification,
        prefix: "SIMPLIFICATION",
        pad: 3,
        first: 1,
        last: 227,
        excluded: Cow::Borrowed(&[]),
    },
    SubtypeSpec {
        subtype: Subtype::Summarization,
        prefix: "SUMMARIZATION",
        pad: 3,
        first: 1,
        last: 226,
        excluded: Cow::Borrowed(&[]),
    },
];

/// Validated per-version lookup table, indexed by [`Subtype::index`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtypeTable {
    version: CorpusVersion,
    specs: [SubtypeSpec; SUBTYPE_COUNT],
}

impl SubtypeTable {
    /// Builds a table after checking every slot.
    ///
    /// # Errors
    /// Returns the first inconsistency found in `specs`.
    pub fn new(
        version: CorpusVersion,
        specs: [SubtypeSpec; SUBTYPE_COUNT],
    ) -> Result<Self, TableError> {
        let table = Self { version, specs };
        table.validate()?;
        Ok(table)
    }

    /// The built-in table for a published corpus version.
    #[must_use]
    pub fn for_version(version: CorpusVersion) -> Self {
        match version {
            CorpusVersion::Ver1 => Self {
                version,
                specs: VER1_SPECS,
            },
        }
    }

    fn validate(&self) -> Result<(), TableError> {
        for (slot, expected) in Subtype::all().enumerate() {
            let spec = &self.specs[slot];
            if spec.subtype != expected {
                return Err(TableError::Misplaced {
                    slot,
                    expected,
                    found: spec.subtype,
                });
            }
            if spec.first == 0 || spec.first > spec.last {
                return Err(TableError::EmptyRange {
                    subtype: spec.subtype,
                    first: spec.first,
                    last: spec.last,
                });
            }
            if spec.pad == 0 {
                return Err(TableError::ZeroPad {
                    subtype: spec.subtype,
                });
            }
            let mut seen = BTreeSet::new();
            for &serial in spec.excluded.iter() {
                if !(spec.first..=spec.last).contains(&serial) {
                    return Err(TableError::ExclusionOutOfRange {
                        subtype: spec.subtype,
                        serial,
                    });
                }
                if !seen.insert(serial) {
                    return Err(TableError::DuplicateExclusion {
                        subtype: spec.subtype,
                        serial,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns a copy with a different zero-pad width for one subtype.
    ///
    /// # Errors
    /// Returns [`TableError::ZeroPad`] when `pad` is zero.
    pub fn with_pad(mut self, subtype: Subtype, pad: usize) -> Result<Self, TableError> {
        self.specs[subtype.index()].pad = pad;
        self.validate()?;
        Ok(self)
    }

    /// Returns a copy whose excluded serials for `subtype` are `excluded`,
    /// sorted, replacing the built-in list.
    ///
    /// # Errors
    /// Returns [`TableError::ExclusionOutOfRange`] or
    /// [`TableError::DuplicateExclusion`] for a bad list.
    pub fn with_exclusions(
        mut self,
        subtype: Subtype,
        mut excluded: Vec<u32>,
    ) -> Result<Self, TableError> {
        excluded.sort_unstable();
        self.specs[subtype.index()].excluded = Cow::Owned(excluded);
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn version(&self) -> CorpusVersion {
        self.version
    }

    #[must_use]
    pub fn spec(&self, subtype: Subtype) -> &SubtypeSpec {
        &self.specs[subtype.index()]
    }

    #[must_use]
    pub fn contains(&self, id: ItemIdentity) -> bool {
        self.spec(id.subtype).contains(id.serial)
    }

    #[must_use]
    pub fn padded_serial(&self, id: ItemIdentity) -> String {
        self.spec(id.subtype).padded(id.serial)
    }

    /// Every identity of the selected subtypes: canonical subtype order, then
    /// ascending serial, known-missing serials skipped.
    #[must_use]
    pub fn list_identities(&self, subtypes: &BTreeSet<Subtype>) -> Vec<ItemIdentity> {
        Subtype::all()
            .filter(|subtype| subtypes.contains(subtype))
            .flat_map(|subtype| {
                self.spec(subtype)
                    .serials()
                    .map(move |serial| ItemIdentity::new(subtype, serial))
            })
            .collect()
    }

    #[must_use]
    pub fn count(&self, subtypes: &BTreeSet<Subtype>) -> usize {
        subtypes.iter().map(|subtype| self.spec(*subtype).len()).sum()
    }
}

impl Default for SubtypeTable {
    fn default() -> Self {
        Self::for_version(CorpusVersion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn all_subtypes() -> BTreeSet<Subtype> {
        Subtype::all().collect()
    }

    #[test]
    fn subtype_tags_round_trip() {
        for subtype in Subtype::all() {
            let parsed = Subtype::from_str(subtype.as_str()).expect("tag parses");
            assert_eq!(parsed, subtype);
        }
        assert_eq!(Subtype::Basic5000.to_string(), "short-form/basic5000");
        assert!(Subtype::from_str("short-form/basic4000").is_err());
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = SubtypeTable::for_version(CorpusVersion::Ver1);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn enumeration_skips_known_missing_serials() {
        let table = SubtypeTable::default();
        let ids = table.list_identities(&BTreeSet::from([Subtype::Onomatopee300]));
        assert_eq!(ids.len(), 184);
        assert!(!ids.contains(&ItemIdentity::new(Subtype::Onomatopee300, 77)));
        assert!(ids.contains(&ItemIdentity::new(Subtype::Onomatopee300, 76)));
        assert!(ids.contains(&ItemIdentity::new(Subtype::Onomatopee300, 78)));

        let basic = table.list_identities(&BTreeSet::from([Subtype::Basic5000]));
        assert_eq!(BASIC5000_MISSING.len(), 43);
        assert_eq!(basic.len(), 3000 - 43);
        for serial in BASIC5000_MISSING {
            assert!(!basic.contains(&ItemIdentity::new(Subtype::Basic5000, *serial)));
        }
    }

    #[test]
    fn enumeration_length_matches_ranges_minus_exclusions() {
        let table = SubtypeTable::default();
        let ranges: usize = Subtype::all()
            .map(|s| (table.spec(s).last - table.spec(s).first + 1) as usize)
            .sum();
        let excluded: usize = Subtype::all().map(|s| table.spec(s).excluded.len()).sum();
        let ids = table.list_identities(&all_subtypes());
        assert_eq!(ids.len(), ranges - excluded);
        assert_eq!(ids.len(), 3862);
        assert_eq!(table.count(&all_subtypes()), ids.len());
    }

    #[test]
    fn enumeration_order_is_canonical_and_stable() {
        let table = SubtypeTable::default();
        let selection = BTreeSet::from([Subtype::Udon, Subtype::VoiceActress100]);
        let first = table.list_identities(&selection);
        let second = table.list_identities(&selection);
        assert_eq!(first, second);
        assert_eq!(first[0], ItemIdentity::new(Subtype::VoiceActress100, 1));
        assert_eq!(first[99], ItemIdentity::new(Subtype::VoiceActress100, 100));
        assert_eq!(first[100], ItemIdentity::new(Subtype::Udon, 1));
        assert_eq!(first.len(), 186);
    }

    #[test]
    fn misplaced_entries_are_rejected() {
        let mut specs = VER1_SPECS;
        specs.swap(0, 1);
        let err = SubtypeTable::new(CorpusVersion::Ver1, specs).unwrap_err();
        assert_eq!(
            err,
            TableError::Misplaced {
                slot: 0,
                expected: Subtype::Basic5000,
                found: Subtype::Onomatopee300,
            }
        );
    }

    #[test]
    fn out_of_range_exclusions_are_rejected() {
        let mut specs = VER1_SPECS;
        specs[2].excluded = Cow::Borrowed(&[101]);
        let err = SubtypeTable::new(CorpusVersion::Ver1, specs).unwrap_err();
        assert_eq!(
            err,
            TableError::ExclusionOutOfRange {
                subtype: Subtype::VoiceActress100,
                serial: 101,
            }
        );
    }

    #[test]
    fn pad_override_applies_to_one_subtype() {
        let table = SubtypeTable::default()
            .with_pad(Subtype::Udon, 3)
            .expect("valid pad");
        assert_eq!(table.padded_serial(ItemIdentity::new(Subtype::Udon, 7)), "007");
        assert_eq!(
            table.padded_serial(ItemIdentity::new(Subtype::WashingtonDc, 7)),
            "07"
        );
        assert_eq!(
            SubtypeTable::default().with_pad(Subtype::Udon, 0),
            Err(TableError::ZeroPad {
                subtype: Subtype::Udon
            })
        );
    }

    #[test]
    fn exclusion_override_replaces_the_builtin_list() {
        let table = SubtypeTable::default()
            .with_exclusions(Subtype::Basic5000, vec![9, 3])
            .expect("valid exclusions");
        assert_eq!(table.spec(Subtype::Basic5000).excluded.as_ref(), &[3, 9]);
        assert_eq!(table.count(&BTreeSet::from([Subtype::Basic5000])), 2998);
        assert!(!table.contains(ItemIdentity::new(Subtype::Basic5000, 3)));
        assert!(table.contains(ItemIdentity::new(Subtype::Basic5000, 147)));

        let cleared = SubtypeTable::default()
            .with_exclusions(Subtype::Onomatopee300, Vec::new())
            .expect("empty list");
        assert_eq!(cleared.count(&BTreeSet::from([Subtype::Onomatopee300])), 185);

        assert_eq!(
            SubtypeTable::default().with_exclusions(Subtype::Udon, vec![4, 4]),
            Err(TableError::DuplicateExclusion {
                subtype: Subtype::Udon,
                serial: 4
            })
        );
        assert_eq!(
            SubtypeTable::default().with_exclusions(Subtype::Udon, vec![87]),
            Err(TableError::ExclusionOutOfRange {
                subtype: Subtype::Udon,
                serial: 87
            })
        );
    }

    #[test]
    fn layout_reflects_pad_and_exclusions() {
        let table = SubtypeTable::default();
        let udon = table.spec(Subtype::Udon).layout();
        assert_eq!(udon, "long-form/udon:UDON:pad=2:range=1..=86:excluded=");
        let padded = table.clone().with_pad(Subtype::Udon, 3).unwrap();
        assert_ne!(padded.spec(Subtype::Udon).layout(), udon);
        let excluded = table.with_exclusions(Subtype::Udon, vec![5]).unwrap();
        assert_ne!(excluded.spec(Subtype::Udon).layout(), udon);
    }

    #[test]
    fn labels_use_subtype_tag_and_plain_serial() {
        let id = ItemIdentity::new(Subtype::Basic5000, 12);
        assert_eq!(id.label(), "short-form/basic5000-12");
    }
}
