//! Weight vectors for the composite score.
//!
//! TOML shape (an omitted vector keeps its default; an omitted term inside a vector is 0):
//! ```toml
//! [weights.full]
//! duration = 0.20
//! low_quality = 0.30
//! universal_disagreement = 0.30
//! asc = 0.20
//! ```
//!
//! Which vector applies is a dataset-wide decision: ASC is "available" when at least one
//! participant has a defined ASC value, likewise for the LLM judge.

use serde::{Deserialize, Serialize};

const SUM_TOLERANCE: f64 = 1e-6;

/// Per-term weights. Terms a vector does not use are 0 (and may be omitted in TOML).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub low_quality: f64,
    #[serde(default)]
    pub universal_disagreement: f64,
    #[serde(default)]
    pub asc: f64,
    #[serde(default)]
    pub judge: f64,
}

impl WeightVector {
    pub const FULL: Self = Self {
        duration: 0.20,
        low_quality: 0.30,
        universal_disagreement: 0.30,
        asc: 0.20,
        judge: 0.0,
    };

    pub const WITHOUT_ASC: Self = Self {
        duration: 0.25,
        low_quality: 0.375,
        universal_disagreement: 0.375,
        asc: 0.0,
        judge: 0.0,
    };

    pub const JUDGE: Self = Self {
        duration: 0.20,
        low_quality: 0.20,
        universal_disagreement: 0.15,
        asc: 0.15,
        judge: 0.30,
    };

    pub const JUDGE_WITHOUT_ASC: Self = Self {
        duration: 0.2375,
        low_quality: 0.2375,
        universal_disagreement: 0.1875,
        asc: 0.0,
        judge: 0.3375,
    };

    /// Order: duration, low-quality, universal disagreement, ASC, judge.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.duration,
            self.low_quality,
            self.universal_disagreement,
            self.asc,
            self.judge,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Non-negative, finite, summing to 1.0.
    pub fn validate(&self) -> bool {
        self.as_array().iter().all(|w| w.is_finite() && *w >= 0.0)
            && (self.sum() - 1.0).abs() < SUM_TOLERANCE
    }
}

/// The four vectors a run chooses from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub full: WeightVector,
    pub without_asc: WeightVector,
    pub judge: WeightVector,
    pub judge_without_asc: WeightVector,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            full: WeightVector::FULL,
            without_asc: WeightVector::WITHOUT_ASC,
            judge: WeightVector::JUDGE,
            judge_without_asc: WeightVector::JUDGE_WITHOUT_ASC,
        }
    }
}

impl WeightTable {
    pub fn select(&self, asc_available: bool, judge_available: bool) -> &WeightVector {
        match (judge_available, asc_available) {
            (false, true) => &self.full,
            (false, false) => &self.without_asc,
            (true, true) => &self.judge,
            (true, false) => &self.judge_without_asc,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let named = [
            ("weights.full", &self.full),
            ("weights.without_asc", &self.without_asc),
            ("weights.judge", &self.judge),
            ("weights.judge_without_asc", &self.judge_without_asc),
        ];
        for (name, w) in named {
            if !w.validate() {
                return Err(format!(
                    "{name} must be non-negative and sum to 1.0 (sum = {})",
                    w.sum()
                ));
            }
        }
        if self.full.judge != 0.0 || self.without_asc.judge != 0.0 {
            return Err("judge weight is only allowed in weights.judge*".into());
        }
        if self.without_asc.asc != 0.0 || self.judge_without_asc.asc != 0.0 {
            return Err("asc weight must be 0 in the *_without_asc vectors".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let t = WeightTable::default();
        assert!(t.validate().is_ok());
        for w in [t.full, t.without_asc, t.judge, t.judge_without_asc] {
            assert!((w.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn selection_matrix() {
        let t = WeightTable::default();
        assert_eq!(*t.select(true, false), WeightVector::FULL);
        assert_eq!(*t.select(false, false), WeightVector::WITHOUT_ASC);
        assert_eq!(*t.select(true, true), WeightVector::JUDGE);
        assert_eq!(*t.select(false, true), WeightVector::JUDGE_WITHOUT_ASC);
    }

    #[test]
    fn broken_sum_is_rejected() {
        let mut t = WeightTable::default();
        t.full.duration += 0.1;
        let err = t.validate().unwrap_err();
        assert!(err.contains("weights.full"));
    }

    #[test]
    fn omitted_terms_are_zero() {
        let w: WeightVector =
            toml::from_str("duration = 0.5\nlow_quality = 0.25\nuniversal_disagreement = 0.25\n")
                .unwrap();
        assert_eq!((w.asc, w.judge), (0.0, 0.0));
        assert!(w.validate());
    }

    #[test]
    fn asc_weight_in_without_asc_is_rejected() {
        let mut t = WeightTable::default();
        t.without_asc = WeightVector {
            duration: 0.25,
            low_quality: 0.25,
            universal_disagreement: 0.25,
            asc: 0.25,
            judge: 0.0,
        };
        assert!(t.validate().is_err());
    }
}
