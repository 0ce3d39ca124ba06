//! Contextual probability boosting.
//!
//! ## Order of operations
//!
//! ```text
//! raw distribution
//!     │  raw arg-max < min_trust ? ──► return raw (no boosting)
//!     ▼
//! × (1 + lm_score · lm_factor)      for labels in the language cache
//!     ▼
//! × category_factor                 for labels in the active category
//!     ▼
//! renormalise to 1 → boosted arg-max
//! ```
//!
//! ## Category state
//!
//! `None` → `Auto` when an accepted word belongs to a known category.
//! `set_context(.., manual = true)` → `Manual`, which blocks automatic
//! inference until the context is cleared with `set_context(None, ..)`.

pub mod category;
pub mod language;

pub use category::CategoryTable;
pub use language::{LanguageScoreCache, WordHistory};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SignaError};
use crate::inference::{arg_max, ClassificationResult, LabelSet, LanguageModelHandle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct BoostConfig {
    /// Apply the active category's boost. Default: true.
    pub category_enabled: bool,
    /// Apply language-model priors. Default: true.
    pub language_enabled: bool,
    /// Multiplier for labels in the active category. Default: 1.5.
    pub category_factor: f32,
    /// Scale applied to language priors. Default: 2.0.
    pub lm_factor: f32,
    /// Raw confidence below which no boost is applied. Default: 0.15.
    pub min_trust: f32,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            category_enabled: true,
            language_enabled: true,
            category_factor: 1.5,
            lm_factor: 2.0,
            min_trust: 0.15,
        }
    }
}

impl BoostConfig {
    pub fn normalize(&mut self) {
        self.category_factor = self.category_factor.clamp(1.0, 10.0);
        self.lm_factor = self.lm_factor.clamp(0.0, 50.0);
        self.min_trust = self.min_trust.clamp(0.0, 1.0);
    }
}

/// Current category context and how it was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    None,
    /// Set explicitly by the user; automatic inference is suspended.
    Manual(String),
    /// Inferred from the last accepted word.
    Auto(String),
}

impl ContextState {
    pub fn name(&self) -> Option<&str> {
        match self {
            ContextState::None => None,
            ContextState::Manual(name) | ContextState::Auto(name) => Some(name),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ContextState::Manual(_))
    }
}

/// Result of boosting one distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostOutcome {
    pub label: usize,
    pub confidence: f32,
    /// Any multiplier was applied.
    pub boosted: bool,
    /// The winner differs from the raw arg-max.
    pub changed: bool,
}

/// Per-session booster: category state, language cache and their tables.
#[derive(Debug)]
pub struct ContextBooster {
    config: BoostConfig,
    labels: LabelSet,
    categories: Arc<CategoryTable>,
    state: ContextState,
    /// Label indices of the active category, resolved when it changes.
    active_labels: Vec<usize>,
    cache: LanguageScoreCache,
    context_changed: bool,
}

impl ContextBooster {
    pub fn new(config: BoostConfig, labels: LabelSet, categories: Arc<CategoryTable>) -> Self {
        Self {
            config,
            labels,
            categories,
            state: ContextState::None,
            active_labels: Vec::new(),
            cache: LanguageScoreCache::default(),
            context_changed: false,
        }
    }

    /// Re-weight `raw` by the language cache and active category.
    pub fn boost(&self, raw: &ClassificationResult) -> BoostOutcome {
        let unboosted = BoostOutcome {
            label: raw.label,
            confidence: raw.confidence,
            boosted: false,
            changed: false,
        };
        // Never promote a label the classifier itself barely saw.
        if raw.confidence < self.config.min_trust {
            return unboosted;
        }

        let mut probs = raw.distribution.clone();
        let mut boosted = false;

        if self.config.language_enabled && !self.cache.is_empty() {
            for (label, score) in self.cache.iter() {
                if let Some(p) = probs.get_mut(label) {
                    *p *= 1.0 + score * self.config.lm_factor;
                    boosted = true;
                }
            }
        }

        if self.config.category_enabled {
            for &label in &self.active_labels {
                if let Some(p) = probs.get_mut(label) {
                    *p *= self.config.category_factor;
                    boosted = true;
                }
            }
        }

        if !boosted {
            return unboosted;
        }

        let sum: f32 = probs.iter().sum();
        if sum > 0.0 {
            probs.iter_mut().for_each(|p| *p /= sum);
        }
        let (label, confidence) = arg_max(&probs);
        let changed = label != raw.label;
        if changed {
            debug!(
                raw_label = raw.label,
                raw_confidence = raw.confidence,
                label,
                confidence,
                "context boost changed winner"
            );
        }
        BoostOutcome {
            label,
            confidence,
            boosted,
            changed,
        }
    }

    /// Set or clear the category context.
    ///
    /// `manual = false` is an automatic suggestion and is ignored while a
    /// manual context is active. Returns the context in effect afterwards.
    ///
    /// # Errors
    /// `SignaError::UnknownCategory` if `name` is not in the table.
    pub fn set_context(&mut self, name: Option<&str>, manual: bool) -> Result<Option<&str>> {
        let next = match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => ContextState::None,
            Some(raw) => {
                let canonical = self
                    .categories
                    .canonical_name(raw)
                    .ok_or_else(|| SignaError::UnknownCategory(raw.to_string()))?
                    .to_string();
                if manual {
                    ContextState::Manual(canonical)
                } else if self.state.is_manual() {
                    debug!(suggested = %canonical, "manual context active, ignoring suggestion");
                    return Ok(self.state.name());
                } else {
                    ContextState::Auto(canonical)
                }
            }
        };
        self.transition(next);
        Ok(self.state.name())
    }

    /// Infer the category from an accepted word. Returns true if the context
    /// changed.
    pub fn infer_from_word(&mut self, word: &str) -> bool {
        if self.state.is_manual() {
            return false;
        }
        let Some(category) = self.categories.category_of(word) else {
            return false;
        };
        if self.state.name() == Some(category) {
            return false;
        }
        let next = ContextState::Auto(category.to_string());
        self.transition(next);
        true
    }

    /// Recompute language priors from `history`.
    ///
    /// A failing model leaves the cache empty; boosting then proceeds on the
    /// category alone.
    pub fn refresh_language(&mut self, history: &WordHistory, model: Option<&LanguageModelHandle>) {
        if let Err(e) = self.cache.refresh(history, model, &self.labels) {
            warn!("language model refresh failed ({e}), continuing without priors");
        }
    }

    /// True once after every context change.
    pub fn take_context_changed(&mut self) -> bool {
        std::mem::take(&mut self.context_changed)
    }

    pub fn current_context(&self) -> Option<&str> {
        self.state.name()
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn cache(&self) -> &LanguageScoreCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LanguageScoreCache {
        &mut self.cache
    }

    fn transition(&mut self, next: ContextState) {
        if next == self.state {
            return;
        }
        if next.name() != self.state.name() {
            self.context_changed = true;
        }
        self.active_labels = next
            .name()
            .map(|name| self.categories.label_indices(name, &self.labels))
            .unwrap_or_default();
        info!(from = ?self.state, to = ?next, "category context changed");
        self.state = next;
    }
}
