//! Immutable label set shared by the classifier and every session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, SignaError};

/// Index-addressable label names, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Arc<[String]>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelsFile {
    List(Vec<String>),
    IndexMap(HashMap<String, String>),
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse either a JSON array of names or a `{"0": "HOLA", ...}` map.
    ///
    /// # Errors
    /// `SignaError::Config` if map keys are not a dense `0..n` range.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        match serde_json::from_str::<LabelsFile>(raw)? {
            LabelsFile::List(names) => Ok(Self::new(names)),
            LabelsFile::IndexMap(map) => {
                let mut slots: Vec<Option<String>> = vec![None; map.len()];
                for (key, name) in map {
                    let index: usize = key
                        .trim()
                        .parse()
                        .map_err(|_| SignaError::Config(format!("label key '{key}' is not an index")))?;
                    let slot = slots.get_mut(index).ok_or_else(|| {
                        SignaError::Config(format!("label index {index} outside dense range"))
                    })?;
                    *slot = Some(name);
                }
                let names = slots
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| {
                        name.ok_or_else(|| SignaError::Config(format!("label index {i} missing")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::new(names))
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Exact match first, then ASCII case-insensitive.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.names
            .iter()
            .position(|n| n == name)
            .or_else(|| self.names.iter().position(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
