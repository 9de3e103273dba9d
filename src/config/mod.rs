// src/config/mod.rs
//! Run configuration for the PRI pipeline.
//!
//! Loaded from TOML (`$PRI_CONFIG_PATH`, else `config/pri.toml`, else built-in defaults), then
//! the four threshold env overrides are applied and the result is validated. Every calculator
//! receives the resulting `PriConfig` by reference; nothing reads configuration on its own.
//!
//! ```toml
//! [thresholds]
//! asc_high = 0.80
//! asc_low = 0.20
//! universal_disagreement = 0.20
//! universal_disagreement_coverage = 0.90
//!
//! [policy]
//! missing_terms = "renormalize"   # or "propagate"
//! disagreement = "all_only"       # or "segment_coverage"
//! ```

pub mod judge;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyze::scoring::MissingTermPolicy;
use crate::analyze::weights::WeightTable;
use crate::error::{PriError, Result};
use crate::signals::disagreement::DisagreementPolicy;

pub const DEFAULT_PRI_CONFIG_PATH: &str = "config/pri.toml";
pub const ENV_PRI_CONFIG_PATH: &str = "PRI_CONFIG_PATH";

pub const ENV_ASC_HIGH_THRESHOLD: &str = "PRI_ASC_HIGH_THRESHOLD";
pub const ENV_ASC_LOW_THRESHOLD: &str = "PRI_ASC_LOW_THRESHOLD";
pub const ENV_UNIVERSAL_DISAGREEMENT_THRESHOLD: &str = "PRI_UNIVERSAL_DISAGREEMENT_THRESHOLD";
pub const ENV_UNIVERSAL_DISAGREEMENT_COVERAGE: &str = "PRI_UNIVERSAL_DISAGREEMENT_COVERAGE";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriConfig {
    pub thresholds: Thresholds,
    pub segments: SegmentsCfg,
    pub normalization: NormalizationCfg,
    pub weights: WeightTable,
    pub policy: PolicyCfg,
    pub run: RunCfg,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Agreement rate at or above which an item is strong-agree.
    pub asc_high: f64,
    /// Agreement rate at or below which an item is strong-disagree.
    pub asc_low: f64,
    /// A response below this overall agreement rate counts as universally disagreed.
    pub universal_disagreement: f64,
    /// Share of major segments that must also disagree (segment-coverage policy only).
    pub universal_disagreement_coverage: f64,
    /// Per-segment agreement rate below which a segment counts as disagreeing.
    pub segment_disagreement: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            asc_high: 0.80,
            asc_low: 0.20,
            universal_disagreement: 0.20,
            universal_disagreement_coverage: 0.90,
            segment_disagreement: 0.40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentsCfg {
    /// Minimum average participant count for a segment to be "major".
    pub major_min_participants: f64,
}

impl Default for SegmentsCfg {
    fn default() -> Self {
        Self {
            major_min_participants: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizationCfg {
    /// Durations above this cap normalize to 1.0; unset means plain min-max.
    pub duration_reasonable_max_secs: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyCfg {
    pub missing_terms: MissingTermPolicy,
    pub disagreement: DisagreementPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunCfg {
    /// Compute participants on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl PriConfig {
    /// Parse a TOML document and validate it (no env overrides).
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PriConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path, apply env overrides, validate.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PriError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: PriConfig = toml::from_str(&content)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        info!(target: "pri", path = %path.display(), "loaded PRI config");
        Ok(cfg)
    }

    /// Resolve the config file:
    /// 1) $PRI_CONFIG_PATH (must exist)
    /// 2) config/pri.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PRI_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(PriError::InvalidConfig(format!(
                    "{ENV_PRI_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                )));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_PRI_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        let mut cfg = PriConfig::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PRI_*` threshold overrides. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        let t = &mut self.thresholds;
        if let Some(v) = parse_fraction_env(std::env::var(ENV_ASC_HIGH_THRESHOLD).ok()) {
            t.asc_high = v;
        }
        if let Some(v) = parse_fraction_env(std::env::var(ENV_ASC_LOW_THRESHOLD).ok()) {
            t.asc_low = v;
        }
        if let Some(v) =
            parse_fraction_env(std::env::var(ENV_UNIVERSAL_DISAGREEMENT_THRESHOLD).ok())
        {
            t.universal_disagreement = v;
        }
        if let Some(v) =
            parse_fraction_env(std::env::var(ENV_UNIVERSAL_DISAGREEMENT_COVERAGE).ok())
        {
            t.universal_disagreement_coverage = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, v) in [
            ("thresholds.asc_high", t.asc_high),
            ("thresholds.asc_low", t.asc_low),
            ("thresholds.universal_disagreement", t.universal_disagreement),
            (
                "thresholds.universal_disagreement_coverage",
                t.universal_disagreement_coverage,
            ),
            ("thresholds.segment_disagreement", t.segment_disagreement),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PriError::InvalidConfig(format!(
                    "{name} = {v} must be within [0, 1]"
                )));
            }
        }
        if t.asc_low >= t.asc_high {
            return Err(PriError::InvalidConfig(format!(
                "thresholds.asc_low ({}) must be below thresholds.asc_high ({})",
                t.asc_low, t.asc_high
            )));
        }
        if let Some(cap) = self.normalization.duration_reasonable_max_secs {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(PriError::InvalidConfig(format!(
                    "normalization.duration_reasonable_max_secs = {cap} must be positive"
                )));
            }
        }
        self.weights.validate().map_err(PriError::InvalidConfig)
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_fraction_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PriConfig::default();
        assert_eq!(cfg.thresholds.asc_high, 0.80);
        assert_eq!(cfg.thresholds.asc_low, 0.20);
        assert_eq!(cfg.thresholds.universal_disagreement, 0.20);
        assert_eq!(cfg.thresholds.universal_disagreement_coverage, 0.90);
        assert_eq!(cfg.policy.missing_terms, MissingTermPolicy::Renormalize);
        assert_eq!(cfg.policy.disagreement, DisagreementPolicy::AllOnly);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = PriConfig::from_toml_str(
            r#"
            [thresholds]
            asc_high = 0.7
            asc_low = 0.3

            [policy]
            missing_terms = "propagate"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.thresholds.asc_high, 0.7);
        assert_eq!(cfg.thresholds.asc_low, 0.3);
        assert_eq!(cfg.thresholds.universal_disagreement, 0.20);
        assert_eq!(cfg.policy.missing_terms, MissingTermPolicy::Propagate);
        assert_eq!(cfg.weights, WeightTable::default());
    }

    #[test]
    fn inverted_asc_thresholds_are_rejected() {
        let err = PriConfig::from_toml_str(
            r#"
            [thresholds]
            asc_high = 0.2
            asc_low = 0.8
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PriError::InvalidConfig(_)));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = PriConfig::from_toml_str("[thresholds]\nuniversal_disagreement = 1.5\n")
            .unwrap_err();
        assert!(err.to_string().contains("universal_disagreement"));
    }

    #[test]
    fn parse_fraction_env_clamps_and_ignores_garbage() {
        assert_eq!(parse_fraction_env(Some(" 0.75 ".into())), Some(0.75));
        assert_eq!(parse_fraction_env(Some("3".into())), Some(1.0));
        assert_eq!(parse_fraction_env(Some("-1".into())), Some(0.0));
        assert_eq!(parse_fraction_env(Some("abc".into())), None);
        assert_eq!(parse_fraction_env(Some("NaN".into())), None);
        assert_eq!(parse_fraction_env(None), None);
    }

    #[test]
    #[serial]
    fn env_overrides_replace_file_thresholds() {
        std::env::set_var(ENV_ASC_HIGH_THRESHOLD, "0.9");
        std::env::set_var(ENV_UNIVERSAL_DISAGREEMENT_COVERAGE, "0.5");
        let mut cfg = PriConfig::default();
        cfg.apply_env_overrides();
        std::env::remove_var(ENV_ASC_HIGH_THRESHOLD);
        std::env::remove_var(ENV_UNIVERSAL_DISAGREEMENT_COVERAGE);

        assert_eq!(cfg.thresholds.asc_high, 0.9);
        assert_eq!(cfg.thresholds.universal_disagreement_coverage, 0.5);
        assert_eq!(cfg.thresholds.asc_low, 0.20);
    }
}
