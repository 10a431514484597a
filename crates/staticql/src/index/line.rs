//! Index codec - the `PrefixIndexLine` JSONL schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{QueryEngineError, Result};

/// One physical line of an `_index.jsonl` shard file.
///
/// `refs` maps slug -> {field -> ordered values}. It carries every indexed
/// field's resolved values for that record (not only the field this line's
/// directory indexes), so the planner can sort a page by any indexed
/// order-by field without a second index lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixIndexLine {
    pub v: String,
    pub vs: String,
    #[serde(rename = "ref")]
    pub refs: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl PrefixIndexLine {
    pub fn decode_line(line: &str, path: &std::path::Path, byte_offset: usize) -> Result<Self> {
        serde_json::from_str(line).map_err(|err| QueryEngineError::InconsistentIndex {
            path: path.to_path_buf(),
            message: format!("malformed line at byte offset {byte_offset}: {err}"),
        })
    }

    pub fn encode_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Merges `other`'s slug entries into `self` under key union, matching
    /// the full-build merge rule: later slug wins per-field on conflict.
    pub fn merge(&mut self, other: PrefixIndexLine) {
        for (slug, fields) in other.refs {
            self.refs.insert(slug, fields);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut refs = BTreeMap::new();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), vec!["ゴボウ".to_string()]);
        refs.insert("arctium-lappa".to_string(), fields);
        let line = PrefixIndexLine {
            v: "arctium-lappa".into(),
            vs: "ar".into(),
            refs,
        };
        let encoded = line.encode_line().unwrap();
        let decoded =
            PrefixIndexLine::decode_line(&encoded, std::path::Path::new("x"), 0).unwrap();
        assert_eq!(line, decoded);
    }
}
