use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use jsss_domain::Subtype;
use toml_edit::{DocumentMut, Item};

pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";

/// Values read from a `config.toml`; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileSettings {
    pub(crate) data_root: Option<PathBuf>,
    pub(crate) corpus_address: Option<String>,
    pub(crate) dataset_address: Option<String>,
    pub(crate) download: Option<bool>,
    pub(crate) workers: Option<usize>,
    pub(crate) http_timeout_secs: Option<u64>,
    pub(crate) pad: BTreeMap<Subtype, usize>,
    pub(crate) exclude: BTreeMap<Subtype, Vec<u32>>,
}

impl FileSettings {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let doc: DocumentMut = contents.parse()?;
        let mut settings = Self {
            data_root: string_field(&doc, "data_root")?.map(PathBuf::from),
            corpus_address: string_field(&doc, "corpus_address")?,
            dataset_address: string_field(&doc, "dataset_address")?,
            download: match doc.get("download") {
                None => None,
                Some(item) => Some(
                    item.as_bool()
                        .ok_or_else(|| anyhow!("`download` must be a boolean"))?,
                ),
            },
            workers: positive_field(&doc, "workers")?,
            http_timeout_secs: positive_field(&doc, "http_timeout")?
                .map(|secs: usize| secs as u64),
            pad: BTreeMap::new(),
            exclude: BTreeMap::new(),
        };
        if let Some(item) = doc.get("pad") {
            let table = item
                .as_table_like()
                .ok_or_else(|| anyhow!("`pad` must be a table of subtype = width"))?;
            for (key, value) in table.iter() {
                let subtype: Subtype = key
                    .parse()
                    .map_err(|_| anyhow!("unknown subtype `{key}` in [pad]"))?;
                let width = value
                    .as_integer()
                    .and_then(|width| usize::try_from(width).ok())
                    .ok_or_else(|| anyhow!("pad width for `{key}` must be a positive integer"))?;
                settings.pad.insert(subtype, width);
            }
        }
        if let Some(item) = doc.get("exclude") {
            let table = item
                .as_table_like()
                .ok_or_else(|| anyhow!("`exclude` must be a table of subtype = [serials]"))?;
            for (key, value) in table.iter() {
                let subtype: Subtype = key
                    .parse()
                    .map_err(|_| anyhow!("unknown subtype `{key}` in [exclude]"))?;
                let serials = value
                    .as_array()
                    .ok_or_else(|| anyhow!("exclusions for `{key}` must be an array"))?
                    .iter()
                    .map(|serial| {
                        serial
                            .as_integer()
                            .and_then(|serial| u32::try_from(serial).ok())
                            .ok_or_else(|| {
                                anyhow!("exclusions for `{key}` must be non-negative integers")
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                settings.exclude.insert(subtype, serials);
            }
        }
        Ok(settings)
    }
}

fn string_field(doc: &DocumentMut, key: &str) -> Result<Option<String>> {
    match doc.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_str()
            .map(|value| Some(value.to_string()))
            .ok_or_else(|| anyhow!("`{key}` must be a string")),
    }
}

fn positive_field(doc: &DocumentMut, key: &str) -> Result<Option<usize>> {
    let Some(item) = doc.get(key) else {
        return Ok(None);
    };
    match item_integer(item) {
        Some(value) if value > 0 => Ok(Some(value)),
        _ => bail!("`{key}` must be a positive integer"),
    }
}

fn item_integer(item: &Item) -> Option<usize> {
    item.as_integer().and_then(|value| usize::try_from(value).ok())
}

/// `<config dir>/jsss/config.toml`, if the platform has a config dir.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("jsss").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_key() {
        let settings = FileSettings::parse(
            r#"
data_root = "/srv/jsss"
corpus_address = "https://mirror.invalid/jsss_ver1.zip"
dataset_address = "https://mirror.invalid/datasets/"
download = true
workers = 3
http_timeout = 15

[pad]
"long-form/udon" = 3
"summarization" = 4

[exclude]
"short-form/basic5000" = [12, 40]
"short-form/onomatopee300" = []
"#,
        )
        .unwrap();
        assert_eq!(settings.data_root, Some(PathBuf::from("/srv/jsss")));
        assert_eq!(settings.download, Some(true));
        assert_eq!(settings.workers, Some(3));
        assert_eq!(settings.http_timeout_secs, Some(15));
        assert_eq!(settings.pad.get(&Subtype::Udon), Some(&3));
        assert_eq!(settings.pad.get(&Subtype::Summarization), Some(&4));
        assert_eq!(
            settings.exclude.get(&Subtype::Basic5000),
            Some(&vec![12, 40])
        );
        assert_eq!(
            settings.exclude.get(&Subtype::Onomatopee300),
            Some(&Vec::new())
        );
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(FileSettings::parse("").unwrap(), FileSettings::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(FileSettings::parse("workers = 0").is_err());
        assert!(FileSettings::parse("download = \"yes\"").is_err());
        assert!(FileSettings::parse("[pad]\n\"long-form/pizza\" = 2").is_err());
        assert!(FileSettings::parse("data_root = 5").is_err());
        assert!(FileSettings::parse("[exclude]\n\"long-form/udon\" = 3").is_err());
        assert!(FileSettings::parse("[exclude]\n\"long-form/udon\" = [-1]").is_err());
    }
}
