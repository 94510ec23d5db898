use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Fear & Greed Index bucket as published alongside the daily value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl Classification {
    /// Parse the published label ("Extreme Fear", "greed", "EXTREME_GREED" ...).
    pub fn from_label(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "extremefear" => Some(Classification::ExtremeFear),
            "fear" => Some(Classification::Fear),
            "neutral" => Some(Classification::Neutral),
            "greed" => Some(Classification::Greed),
            "extremegreed" => Some(Classification::ExtremeGreed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::ExtremeFear => "Extreme Fear",
            Classification::Fear => "Fear",
            Classification::Neutral => "Neutral",
            Classification::Greed => "Greed",
            Classification::ExtremeGreed => "Extreme Greed",
        }
    }

    pub fn regime(&self) -> Regime {
        match self {
            Classification::ExtremeFear | Classification::Fear => Regime::Fear,
            Classification::Neutral => Regime::Neutral,
            Classification::Greed | Classification::ExtremeGreed => Regime::Greed,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Regime
// ---------------------------------------------------------------------------

/// Coarse three-way sentiment grouping used for filtering and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regime {
    Fear,
    Neutral,
    Greed,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Fear, Regime::Neutral, Regime::Greed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Fear => "Fear",
            Regime::Neutral => "Neutral",
            Regime::Greed => "Greed",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SentimentRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub date: NaiveDate,
    /// Index value, 0 (extreme fear) to 100 (extreme greed).
    pub index_value: u8,
    pub classification: Classification,
}

impl SentimentRecord {
    pub fn regime(&self) -> Regime {
        self.classification.regime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_from_label() {
        assert_eq!(
            Classification::from_label("Extreme Fear"),
            Some(Classification::ExtremeFear)
        );
        assert_eq!(
            Classification::from_label("greed"),
            Some(Classification::Greed)
        );
        assert_eq!(
            Classification::from_label(" Neutral "),
            Some(Classification::Neutral)
        );
        assert_eq!(
            Classification::from_label("EXTREME_GREED"),
            Some(Classification::ExtremeGreed)
        );
        assert_eq!(Classification::from_label("panic"), None);
        assert_eq!(Classification::from_label(""), None);
    }

    #[test]
    fn test_regime_grouping() {
        assert_eq!(Classification::ExtremeFear.regime(), Regime::Fear);
        assert_eq!(Classification::Fear.regime(), Regime::Fear);
        assert_eq!(Classification::Neutral.regime(), Regime::Neutral);
        assert_eq!(Classification::Greed.regime(), Regime::Greed);
        assert_eq!(Classification::ExtremeGreed.regime(), Regime::Greed);
    }

    #[test]
    fn test_display_round_trips_through_label() {
        for c in [
            Classification::ExtremeFear,
            Classification::Fear,
            Classification::Neutral,
            Classification::Greed,
            Classification::ExtremeGreed,
        ] {
            assert_eq!(Classification::from_label(&c.to_string()), Some(c));
        }
    }
}
