//! Bidirectional mapping between post-type names and their numeric ids.

use crate::error::{CodecError, Result};
use crate::model::PostType;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Type table supplied by the caller before parsing.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    by_name: BTreeMap<String, i64>,
    by_id: BTreeMap<i64, String>,
}

#[derive(Deserialize)]
struct TypeRow {
    id: i64,
    #[serde(rename = "type")]
    name: String,
}

impl TypeRegistry {
    /// The five built-in types with their conventional ids.
    pub fn standard() -> Self {
        Self::from_pairs([(1, "answer"), (2, "link"), (3, "photo"), (4, "regular"), (5, "video")])
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut reg = Self::default();
        for (id, name) in pairs {
            reg.insert(id, name);
        }
        reg
    }

    /// Load a `[{"id": 1, "type": "answer"}, ...]` table.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let rows: Vec<TypeRow> = serde_json::from_str(s)?;
        Ok(Self::from_pairs(rows.into_iter().map(|r| (r.id, r.name))))
    }

    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        let name = name.into();
        if let Some(old) = self.by_id.insert(id, name.clone()) {
            self.by_name.remove(&old);
        }
        self.by_name.insert(name, id);
    }

    pub fn resolve(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve a `type` attribute to its symbolic type, round-tripping through the id.
    pub fn post_type(&self, name: &str) -> Result<PostType> {
        let id = self.resolve(name).ok_or_else(|| CodecError::UnknownType(name.to_string()))?;
        let canonical = self.name_of(id).ok_or_else(|| CodecError::UnknownType(name.to_string()))?;
        canonical.parse()
    }
}
