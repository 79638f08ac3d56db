use crate::models::DownloadEntry;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use std::fs;
use thiserror::Error;

/// Errors that prevent the download list from being used at all.
#[derive(Error, Debug)]
pub enum DownloadListError {
    #[error("download list not found at {0}")]
    NotFound(Utf8PathBuf),

    #[error("failed to read download list {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse download list {path}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("download list {path} must be a sequence of records with a `url` field")]
    NotASequence { path: Utf8PathBuf },
}

impl DownloadListError {
    /// Process exit status for a configuration failure.
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// A record that was left out of the download list, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    /// Zero-based position in the document
    pub index: usize,
    pub reason: String,
}

/// Ordered download entries parsed from the download list document.
///
/// The document is a YAML sequence of mappings, each with a string `url`:
///
/// ```yaml
/// - url: https://example.com/mods/foo.zip
/// - url: https://example.com/mods/bar.zip
///   name: optional extra keys are ignored
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadList {
    pub entries: Vec<DownloadEntry>,
    pub dropped: Vec<DroppedRecord>,
}

impl DownloadList {
    /// Read and parse the download list at `path`.
    pub fn load(path: &Utf8Path) -> Result<Self, DownloadListError> {
        if !path.exists() {
            return Err(DownloadListError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|source| DownloadListError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::parse(&contents, path)?;
        tracing::debug!(
            "Loaded download list from {}: {} entries, {} dropped",
            path,
            list.entries.len(),
            list.dropped.len()
        );
        Ok(list)
    }

    /// Parse download list text; `origin` is only used in error messages.
    pub fn parse(contents: &str, origin: &Utf8Path) -> Result<Self, DownloadListError> {
        let document: Value =
            serde_yaml_ng::from_str(contents).map_err(|source| DownloadListError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        let records = match document {
            Value::Null => return Ok(Self::default()),
            Value::Sequence(records) => records,
            _ => {
                return Err(DownloadListError::NotASequence {
                    path: origin.to_path_buf(),
                });
            }
        };

        let mut list = Self::default();
        for (index, record) in records.into_iter().enumerate() {
            match record_url(record) {
                Ok(url) => list.entries.push(DownloadEntry::new(url)),
                Err(reason) => {
                    tracing::warn!("Dropping download record #{}: {}", index, reason);
                    list.dropped.push(DroppedRecord { index, reason });
                }
            }
        }

        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn record_url(record: Value) -> Result<String, String> {
    let fields: IndexMap<String, Value> = serde_yaml_ng::from_value(record)
        .map_err(|e| format!("record is not a mapping with string keys ({e})"))?;

    match fields.get("url") {
        Some(Value::String(url)) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        Some(Value::String(_)) => Err("`url` is empty".to_string()),
        Some(_) => Err("`url` is not a string".to_string()),
        None if fields.is_empty() => Err("record has no fields".to_string()),
        None => Err(format!(
            "record has no `url` field (found: {})",
            fields.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<DownloadList, DownloadListError> {
        DownloadList::parse(text, Utf8Path::new("env.yaml"))
    }

    #[test]
    fn test_parse_in_document_order() {
        let list = parse(
            "- url: https://example.com/mods/b.zip\n- url: https://example.com/mods/a.zip\n",
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.entries[0].file_name, "b.zip");
        assert_eq!(list.entries[1].file_name, "a.zip");
        assert!(list.dropped.is_empty());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let list = parse("- url: https://example.com/x.zip\n  name: X\n  version: 2\n").unwrap();
        assert_eq!(list.entries[0].url, "https://example.com/x.zip");
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let list = parse(
            r#"
- url: https://example.com/ok.zip
- link: https://example.com/typo.zip
- url: 42
- just a string
- {}
- url: https://example.com/also-ok.zip
"#,
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.entries[1].file_name, "also-ok.zip");

        let indices: Vec<usize> = list.dropped.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert!(list.dropped[0].reason.contains("link"));
        assert!(list.dropped[1].reason.contains("not a string"));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_mapping_is_rejected() {
        let err = parse("url: https://example.com/x.zip\n").unwrap_err();
        assert!(matches!(err, DownloadListError::NotASequence { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let err = parse("- url: [unclosed\n").unwrap_err();
        assert!(matches!(err, DownloadListError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("env.yaml")).unwrap();

        let err = DownloadList::load(&path).unwrap_err();
        assert!(matches!(err, DownloadListError::NotFound(p) if p == path));
    }
}
