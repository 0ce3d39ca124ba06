//! Named stabilizer presets.
//!
//! One parameterised stabilizer serves every deployment; the variants only
//! differ in thresholds and window sizes.

use serde::Serialize;

use super::StabilizerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizerPreset {
    /// General vocabulary at webcam frame rates.
    Balanced,
    /// Fingerspelling and short static signs: small window, quick reset.
    Responsive,
    /// Noisy environments: longer window, higher bar, long absence grace.
    Strict,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetMetadata {
    pub name: &'static str,
    pub label: &'static str,
    pub notes: &'static str,
}

impl StabilizerPreset {
    pub const ALL: [StabilizerPreset; 3] = [
        StabilizerPreset::Balanced,
        StabilizerPreset::Responsive,
        StabilizerPreset::Strict,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StabilizerPreset::Balanced => "balanced",
            StabilizerPreset::Responsive => "responsive",
            StabilizerPreset::Strict => "strict",
        }
    }

    /// Case-insensitive lookup, with a few aliases.
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "balanced" | "default" => Some(StabilizerPreset::Balanced),
            "responsive" | "fast" | "letters" => Some(StabilizerPreset::Responsive),
            "strict" | "stable" => Some(StabilizerPreset::Strict),
            _ => None,
        }
    }

    pub fn config(self) -> StabilizerConfig {
        match self {
            StabilizerPreset::Balanced => StabilizerConfig::default(),
            StabilizerPreset::Responsive => StabilizerConfig {
                accept_threshold: 0.4,
                reject_threshold: 0.2,
                instant_threshold: 0.75,
                fast_break_threshold: 0.65,
                dominance_ratio: 0.5,
                min_votes: 2,
                prediction_capacity: 5,
                landmark_capacity: 15,
                processing_fill_floor: 0.05,
                no_user_grace: 5,
            },
            StabilizerPreset::Strict => StabilizerConfig {
                accept_threshold: 0.55,
                reject_threshold: 0.25,
                instant_threshold: 0.9,
                fast_break_threshold: 0.8,
                dominance_ratio: 0.6,
                min_votes: 4,
                prediction_capacity: 15,
                landmark_capacity: 35,
                processing_fill_floor: 0.05,
                no_user_grace: 15,
            },
        }
    }

    pub fn metadata(self) -> PresetMetadata {
        match self {
            StabilizerPreset::Balanced => PresetMetadata {
                name: self.name(),
                label: "Balanced",
                notes: "Ten-vote window, 60 % dominance, five-frame absence grace.",
            },
            StabilizerPreset::Responsive => PresetMetadata {
                name: self.name(),
                label: "Responsive",
                notes: "Five-vote window for rapid letter sequences.",
            },
            StabilizerPreset::Strict => PresetMetadata {
                name: self.name(),
                label: "Strict",
                notes: "Fifteen-vote window and fifteen-frame grace for unstable framing.",
            },
        }
    }
}

pub fn preset_catalog() -> Vec<PresetMetadata> {
    StabilizerPreset::ALL.iter().map(|p| p.metadata()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for preset in StabilizerPreset::ALL {
            assert_eq!(StabilizerPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(
            StabilizerPreset::from_name(" FAST "),
            Some(StabilizerPreset::Responsive)
        );
        assert_eq!(StabilizerPreset::from_name("turbo"), None);
    }

    #[test]
    fn presets_survive_normalisation_unchanged() {
        for preset in StabilizerPreset::ALL {
            let mut config = preset.config();
            config.normalize();
            assert_eq!(config, preset.config(), "{}", preset.name());
        }
    }

    #[test]
    fn catalog_lists_every_preset() {
        assert_eq!(preset_catalog().len(), StabilizerPreset::ALL.len());
    }
}
