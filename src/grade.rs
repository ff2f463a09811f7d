//! Letter grade for a finished practice, for display only.

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: Tier,
    pub min_accuracy: u8,
    pub min_speed: u32,
}

/// Ordered cut-offs; the first one met wins, anything below all of them is `D`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeThresholds(pub Vec<TierThreshold>);

impl Default for GradeThresholds {
    fn default() -> Self {
        let t = |tier, min_accuracy, min_speed| TierThreshold {
            tier,
            min_accuracy,
            min_speed,
        };
        Self(vec![
            t(Tier::S, 95, 200),
            t(Tier::A, 90, 150),
            t(Tier::B, 80, 100),
            t(Tier::C, 70, 0),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub tier: Tier,
    pub label: String,
}

pub fn rank(accuracy_pct: u8, content_speed: u32, thresholds: &GradeThresholds) -> Grade {
    let tier = thresholds
        .0
        .iter()
        .find(|t| accuracy_pct >= t.min_accuracy && content_speed >= t.min_speed)
        .map_or(Tier::D, |t| t.tier);
    Grade {
        tier,
        label: tier.to_string(),
    }
}
