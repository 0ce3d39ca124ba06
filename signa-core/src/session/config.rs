//! Session configuration (JSON file, environment overrides, presets).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::buffering::DEFAULT_QUEUE_CAPACITY;
use crate::context::language::DEFAULT_HISTORY_CAPACITY;
use crate::context::BoostConfig;
use crate::error::{Result, SignaError};
use crate::motion::MotionConfig;
use crate::orientation::OrientationConfig;
use crate::presence::PresenceConfig;
use crate::stabilizer::{StabilizerConfig, StabilizerPreset};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct SessionConfig {
    pub stabilizer: StabilizerConfig,
    pub presence: PresenceConfig,
    pub motion: MotionConfig,
    pub boost: BoostConfig,
    pub orientation: OrientationConfig,
    /// Accepted words kept as language context. Default: 8.
    pub history_capacity: usize,
    /// Frames queued per session before the oldest is dropped. Default: 4.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stabilizer: StabilizerConfig::default(),
            presence: PresenceConfig::default(),
            motion: MotionConfig::default(),
            boost: BoostConfig::default(),
            orientation: OrientationConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Defaults with the stabilizer replaced by a preset.
    pub fn with_preset(preset: StabilizerPreset) -> Self {
        Self {
            stabilizer: preset.config(),
            ..Self::default()
        }
    }

    /// Strict parse; unknown keys are ignored, malformed values are errors.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.normalize();
        Ok(config)
    }

    /// Lenient load: a missing or malformed file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Self>(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), "invalid session config ({e}), using defaults");
                Self::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), "session config unreadable ({e}), using defaults");
                Self::default()
            }
        };
        config.normalize();
        config
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn normalize(&mut self) {
        self.stabilizer.normalize();
        self.presence.normalize();
        self.motion.normalize();
        self.boost.normalize();
        self.history_capacity = self.history_capacity.clamp(1, 256);
        self.queue_capacity = self.queue_capacity.clamp(1, 256);
    }

    /// Apply `SIGNA_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// - `SIGNA_PRESET`: replaces the stabilizer section with a named preset.
    /// - `SIGNA_CONTEXT_AWARE`: toggles the category boost.
    /// - `SIGNA_LANGUAGE_BOOST`: toggles the language-model boost.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SIGNA_PRESET") {
            let preset = StabilizerPreset::from_name(&raw)
                .ok_or_else(|| SignaError::Config(format!("unknown preset '{}'", raw.trim())))?;
            info!(preset = preset.name(), "stabilizer preset from environment");
            self.stabilizer = preset.config();
        }
        if let Some(raw) = lookup("SIGNA_CONTEXT_AWARE") {
            self.boost.category_enabled = parse_flag("SIGNA_CONTEXT_AWARE", &raw)?;
        }
        if let Some(raw) = lookup("SIGNA_LANGUAGE_BOOST") {
            self.boost.language_enabled = parse_flag("SIGNA_LANGUAGE_BOOST", &raw)?;
        }
        self.normalize();
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SignaError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}
