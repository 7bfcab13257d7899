//! Category metadata parsing.
//!
//! A category's `meta.yaml` is a mapping from item key to a record. The
//! record fields `heading`, `date` and `summary` are lifted into
//! [`ItemMetadata`]; every other field is kept verbatim in `extra` so
//! templates can use whatever the site author puts there.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Metadata for a single content item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMetadata {
    /// Item heading (required)
    pub heading: String,

    /// Date as written by the author. Never parsed.
    pub date: String,

    /// Short summary for listing pages
    pub summary: String,

    /// Remaining fields, passed through to templates
    pub extra: BTreeMap<String, Value>,
}

impl ItemMetadata {
    /// Build metadata from a single YAML record.
    pub fn from_value(value: Value) -> Result<Self, EntryError> {
        let Value::Mapping(map) = value else {
            return Err(EntryError::NotARecord);
        };

        let mut heading = None;
        let mut date = None;
        let mut summary = None;
        let mut extra = BTreeMap::new();

        for (field, value) in map {
            let Some(name) = scalar_to_string(&field) else {
                return Err(EntryError::InvalidFieldName);
            };

            match name.as_str() {
                "heading" => heading = Some(field_string("heading", &value)?),
                "date" => date = Some(field_string("date", &value)?),
                "summary" => summary = Some(field_string("summary", &value)?),
                _ => {
                    extra.insert(name, value);
                }
            }
        }

        Ok(Self {
            heading: heading.ok_or(EntryError::MissingField("heading"))?,
            date: date.unwrap_or_default(),
            summary: summary.unwrap_or_default(),
            extra,
        })
    }

    /// Tags listed under the `tags` extra field, if any.
    pub fn tags(&self) -> Vec<String> {
        match self.extra.get("tags") {
            Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Why a single metadata entry was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("entry is not a record")]
    NotARecord,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must be a string")]
    NotAScalar(&'static str),

    #[error("field names must be strings")]
    InvalidFieldName,

    #[error("invalid item key `{0}`")]
    InvalidKey(String),
}

/// Errors that make a whole metadata file unusable.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("top level must be a mapping of item keys to records")]
    NotAMapping,
}

/// A parsed metadata entry, in file order.
pub type MetadataEntry = (String, Result<ItemMetadata, EntryError>);

/// Parse a metadata document into ordered entries.
///
/// An empty document yields no entries. Individual entries that fail to
/// parse are returned as errors alongside the valid ones.
pub fn parse_metadata(source: &str) -> Result<Vec<MetadataEntry>, MetadataError> {
    if is_blank_document(source) {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_yaml::from_str(source).map_err(|e| MetadataError::InvalidYaml(e.to_string()))?;

    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(map) => map,
        _ => return Err(MetadataError::NotAMapping),
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, record) in map {
        let Some(key) = scalar_to_string(&key) else {
            return Err(MetadataError::NotAMapping);
        };

        let parsed = if is_valid_key(&key) {
            ItemMetadata::from_value(record)
        } else {
            Err(EntryError::InvalidKey(key.clone()))
        };

        entries.push((key, parsed));
    }

    Ok(entries)
}

/// Keys become file names, so they must stay inside their category directory.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
        && !key.starts_with('.')
}

fn is_blank_document(source: &str) -> bool {
    source
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

fn field_string(name: &'static str, value: &Value) -> Result<String, EntryError> {
    scalar_to_string(value).ok_or(EntryError::NotAScalar(name))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_entries_in_file_order() {
        let source = r#"
zebra:
  heading: Last alphabetically
  date: 2024-03-01
  summary: z
apple:
  heading: First alphabetically
  date: 2024-01-01
  summary: a
"#;

        let entries = parse_metadata(source).unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, vec!["zebra", "apple"]);
        let zebra = entries[0].1.as_ref().unwrap();
        assert_eq!(zebra.heading, "Last alphabetically");
        assert_eq!(zebra.date, "2024-03-01");
    }

    #[test]
    fn keeps_extra_fields() {
        let source = r#"
hello:
  heading: Hello
  date: "2024"
  summary: s
  tags: [rust, web]
  cover: cover.png
"#;

        let entries = parse_metadata(source).unwrap();
        let meta = entries[0].1.as_ref().unwrap();

        assert_eq!(meta.tags(), vec!["rust".to_string(), "web".to_string()]);
        assert_eq!(
            meta.extra.get("cover"),
            Some(&Value::String("cover.png".to_string()))
        );
        assert!(!meta.extra.contains_key("heading"));
    }

    #[test]
    fn stringifies_scalar_dates() {
        let entries = parse_metadata("a:\n  heading: A\n  date: 2024\n").unwrap();
        let meta = entries[0].1.as_ref().unwrap();

        assert_eq!(meta.date, "2024");
        assert_eq!(meta.summary, "");
    }

    #[test]
    fn rejects_bad_entries_individually() {
        let source = r#"
good:
  heading: Good
broken: just a string
headless:
  summary: no heading here
"#;

        let entries = parse_metadata(source).unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].1.is_ok());
        assert_eq!(entries[1].1, Err(EntryError::NotARecord));
        assert_eq!(entries[2].1, Err(EntryError::MissingField("heading")));
    }

    #[test]
    fn rejects_path_like_keys() {
        let entries = parse_metadata("../escape:\n  heading: Nope\n").unwrap();

        assert!(matches!(entries[0].1, Err(EntryError::InvalidKey(_))));
    }

    #[test]
    fn empty_document_has_no_entries() {
        assert!(parse_metadata("").unwrap().is_empty());
        assert!(parse_metadata("# nothing yet\n").unwrap().is_empty());
    }

    #[test]
    fn errors_on_non_mapping() {
        let result = parse_metadata("- one\n- two\n");

        assert!(matches!(result, Err(MetadataError::NotAMapping)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = parse_metadata("hello: [unclosed\n");

        assert!(matches!(result, Err(MetadataError::InvalidYaml(_))));
    }
}
