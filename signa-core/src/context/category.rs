//! Static category → label table.
//!
//! Loaded once at startup and shared read-only between sessions.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::inference::LabelSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable {
    categories: BTreeMap<String, Vec<String>>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category<I, S>(mut self, name: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.insert(
            name.trim().to_string(),
            labels.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Parse a `{"Colores": ["Rojo", "Verde"], ...}` object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Canonical spelling of a category name (case-insensitive lookup).
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.categories
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn labels(&self, name: &str) -> Option<&[String]> {
        let key = self.canonical_name(name)?;
        self.categories.get(key).map(Vec::as_slice)
    }

    /// First category (in name order) that lists `word`.
    pub fn category_of(&self, word: &str) -> Option<&str> {
        let word = word.trim();
        self.categories
            .iter()
            .find(|(_, labels)| labels.iter().any(|l| l.eq_ignore_ascii_case(word)))
            .map(|(name, _)| name.as_str())
    }

    /// Label indices of a category within `labels`. Names the label set does
    /// not know are skipped.
    pub fn label_indices(&self, name: &str, labels: &LabelSet) -> Vec<usize> {
        let Some(members) = self.labels(name) else {
            return Vec::new();
        };
        let mut indices: Vec<usize> = members
            .iter()
            .filter_map(|member| {
                let index = labels.index_of(member);
                if index.is_none() {
                    debug!(category = name, label = %member, "category label not in label set");
                }
                index
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
