use serde::{Deserialize, Serialize};

use crate::participant::{JudgeId, ScoreSheet};

/// Panel configuration for a tournament.
///
/// Lists every judging panel, its seats and the rule that turns the seats'
/// scores into a panel result. Supplied to both the aggregator and the sync
/// manager; no component knows seat labels on its own.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   score_range: { min: 0.0, max: 10.0 }
///   panels:
///     - { name: difficulty-voice, label: DV, rule: pairwise-average, seats: [DV-1, DV-2] }
///     - { name: execution, label: E, rule: trimmed-mean-deduction, seats: [E-1, E-2, E-3, E-4] }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Accepted range for a single judge's score (inclusive)
    #[serde(default)]
    pub score_range: ScoreRange,

    /// Panels in display order
    pub panels: Vec<PanelConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            score_range: ScoreRange::default(),
            panels: vec![
                PanelConfig::new(
                    "difficulty-voice",
                    "ДВ",
                    AggregationRule::PairwiseAverage,
                    &["ДВ-1", "ДВ-2"],
                ),
                PanelConfig::new(
                    "difficulty-artistry",
                    "ДА",
                    AggregationRule::PairwiseAverage,
                    &["ДА-1", "ДА-2"],
                ),
                PanelConfig::new(
                    "artistry",
                    "A",
                    AggregationRule::TrimmedMeanDeduction,
                    &["А-1", "А-2", "А-3", "А-4"],
                ),
                PanelConfig::new(
                    "execution",
                    "E",
                    AggregationRule::TrimmedMeanDeduction,
                    &["Е-1", "Е-2", "Е-3", "Е-4"],
                ),
            ],
        }
    }
}

impl ScoringConfig {
    /// All seats across all panels, in panel order.
    pub fn seats(&self) -> impl Iterator<Item = &JudgeId> {
        self.panels.iter().flat_map(|p| p.seats.iter())
    }

    pub fn has_seat(&self, judge: &JudgeId) -> bool {
        self.seats().any(|s| s == judge)
    }

    pub fn panel(&self, name: &str) -> Option<&PanelConfig> {
        self.panels.iter().find(|p| p.name == name)
    }

    /// A score sheet with every configured seat present and absent.
    pub fn blank_sheet(&self) -> ScoreSheet {
        self.seats().map(|s| (s.clone(), None)).collect()
    }
}

/// A named group of judging seats contributing one sub-score.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PanelConfig {
    /// Stable identifier, e.g. "execution"
    pub name: String,

    /// Short column header, e.g. "E" (defaults to the name)
    #[serde(default)]
    pub label: Option<String>,

    pub rule: AggregationRule,

    pub seats: Vec<JudgeId>,
}

impl PanelConfig {
    pub fn new(name: &str, label: &str, rule: AggregationRule, seats: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            rule,
            seats: seats.iter().map(|s| JudgeId::new(*s)).collect(),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationRule {
    /// Mean of exactly two seats, present only when both are.
    PairwiseAverage,
    /// Drop min and max of four seats, `10 - mean(middle two)`.
    TrimmedMeanDeduction,
}

impl AggregationRule {
    /// Number of seats a panel using this rule must have.
    pub fn seat_count(&self) -> usize {
        match self {
            AggregationRule::PairwiseAverage => 2,
            AggregationRule::TrimmedMeanDeduction => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl ScoreRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
