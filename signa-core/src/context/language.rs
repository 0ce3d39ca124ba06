//! Accepted-word history and the language-model prior cache built from it.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::error::Result;
use crate::inference::{LabelSet, LanguageModelHandle};

/// Default number of accepted words kept as language context.
pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

/// Fixed-capacity FIFO of words the user explicitly accepted.
///
/// Only the accept control operation appends here; automatic smoothing never
/// does, so unconfirmed guesses cannot steer the language model.
#[derive(Debug, Clone)]
pub struct WordHistory {
    words: VecDeque<String>,
    capacity: usize,
}

impl WordHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            words: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, word: String) {
        if self.words.len() == self.capacity {
            self.words.pop_front();
        }
        self.words.push_back(word);
    }

    pub fn last(&self) -> Option<&str> {
        self.words.back().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.words.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

impl Default for WordHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Label index → language prior. Stale until [`refresh`](Self::refresh).
#[derive(Debug, Clone, Default)]
pub struct LanguageScoreCache {
    scores: HashMap<usize, f32>,
}

impl LanguageScoreCache {
    /// Recompute priors for `history`.
    ///
    /// An empty history or a missing model leaves the cache empty. Scores for
    /// names outside the label set are dropped.
    ///
    /// # Errors
    /// Propagates the model's failure; the cache is left empty in that case.
    pub fn refresh(
        &mut self,
        history: &WordHistory,
        model: Option<&LanguageModelHandle>,
        labels: &LabelSet,
    ) -> Result<()> {
        self.scores.clear();
        let Some(model) = model else {
            return Ok(());
        };
        if history.is_empty() {
            return Ok(());
        }

        let priors = model.0.score(&history.to_vec())?;
        for (name, score) in priors {
            match labels.index_of(&name) {
                Some(index) if score.is_finite() => {
                    self.scores.insert(index, score.max(0.0));
                }
                Some(_) => warn!(label = %name, "dropping non-finite language prior"),
                None => debug!(label = %name, "language prior for unknown label"),
            }
        }
        debug!(entries = self.scores.len(), "language score cache refreshed");
        Ok(())
    }

    pub fn get(&self, label: usize) -> Option<f32> {
        self.scores.get(&label).copied()
    }

    /// Overwrite one prior directly.
    pub fn insert(&mut self, label: usize, score: f32) {
        self.scores.insert(label, score.max(0.0));
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.scores.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::stub::BigramLanguageModel;

    #[test]
    fn history_is_bounded_fifo() {
        let mut history = WordHistory::new(2);
        history.push("A".into());
        history.push("B".into());
        history.push("C".into());
        assert_eq!(history.to_vec(), vec!["B".to_string(), "C".to_string()]);
        assert_eq!(history.last(), Some("C"));
    }

    #[test]
    fn refresh_maps_names_to_indices() {
        let labels = LabelSet::new(["HOLA", "COMO", "ESTA"]);
        let model = LanguageModelHandle::new(
            BigramLanguageModel::new()
                .with_bigram("COMO", "ESTA", 0.8)
                .with_bigram("COMO", "ADIOS", 0.5),
        );
        let mut history = WordHistory::default();
        history.push("HOLA".into());
        history.push("COMO".into());

        let mut cache = LanguageScoreCache::default();
        cache.refresh(&history, Some(&model), &labels).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(2), Some(0.8));
    }

    #[test]
    fn empty_history_leaves_cache_empty() {
        let labels = LabelSet::new(["HOLA"]);
        let model = LanguageModelHandle::new(BigramLanguageModel::new());
        let mut cache = LanguageScoreCache::default();
        cache.insert(0, 0.3);
        cache
            .refresh(&WordHistory::default(), Some(&model), &labels)
            .unwrap();
        assert!(cache.is_empty());
    }
}
