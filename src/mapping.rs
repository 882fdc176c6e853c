use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type BackendId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub href: String,
    pub ax_name: String,
    pub matched_html_name: Option<String>,
    #[serde(with = "stringified_score")]
    pub score: u32,
    #[serde(skip)]
    pub anchor_position: Option<usize>,
}

impl MatchRecord {
    pub fn unmatched(node_id: impl Into<String>, ax_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            href: String::new(),
            ax_name: ax_name.into(),
            matched_html_name: None,
            score: 0,
            anchor_position: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.anchor_position.is_some() || self.matched_html_name.is_some()
    }
}

/// Match records keyed by backend id, iterated in link-node traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMapping {
    entries: Vec<(BackendId, MatchRecord)>,
    index: HashMap<BackendId, usize>,
}

impl LinkMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; a replaced record keeps its original position.
    pub fn insert(&mut self, backend_id: BackendId, record: MatchRecord) -> Option<MatchRecord> {
        if let Some(&slot) = self.index.get(&backend_id) {
            return Some(std::mem::replace(&mut self.entries[slot].1, record));
        }
        self.index.insert(backend_id, self.entries.len());
        self.entries.push((backend_id, record));
        None
    }

    pub fn get(&self, backend_id: BackendId) -> Option<&MatchRecord> {
        self.index
            .get(&backend_id)
            .map(|slot| &self.entries[*slot].1)
    }

    pub fn contains(&self, backend_id: BackendId) -> bool {
        self.index.contains_key(&backend_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackendId, &MatchRecord)> + '_ {
        self.entries.iter().map(|(id, record)| (*id, record))
    }

    pub fn matched_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, record)| record.is_matched())
            .count()
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl FromIterator<(BackendId, MatchRecord)> for LinkMapping {
    fn from_iter<I: IntoIterator<Item = (BackendId, MatchRecord)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (backend_id, record) in iter {
            mapping.insert(backend_id, record);
        }
        mapping
    }
}

impl Serialize for LinkMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (backend_id, record) in &self.entries {
            map.serialize_entry(&backend_id.to_string(), record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LinkMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = LinkMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by integer backend ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LinkMapping, A::Error> {
                let mut mapping = LinkMapping::new();
                while let Some((key, record)) = access.next_entry::<String, MatchRecord>()? {
                    let backend_id = key.trim().parse::<BackendId>().map_err(|_| {
                        de::Error::custom(format!("backend id `{key}` is not an integer"))
                    })?;
                    mapping.insert(backend_id, record);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// Scores are written as strings and read back from strings or numbers.
pub(crate) mod stringified_score {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(score: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(score)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        struct ScoreVisitor;

        impl Visitor<'_> for ScoreVisitor {
            type Value = u32;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative score as an integer or a string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<u32, E> {
                u32::try_from(value).map_err(|_| E::custom(format!("score {value} out of range")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<u32, E> {
                // Unmatched records from older dumps carry -1.
                Ok(u32::try_from(value).unwrap_or(0))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<u32, E> {
                let parsed = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| E::custom(format!("score `{value}` is not an integer")))?;
                self.visit_i64(parsed)
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}
