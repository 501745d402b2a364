use super::config::{AggregationRule, ScoringConfig};
use super::rules::round_to;
use crate::participant::ScoreSheet;

#[derive(Debug, Clone, PartialEq)]
pub struct PanelResult {
    pub name: String,
    pub label: String,
    pub rule: AggregationRule,
    pub value: Option<f64>,
}

/// Derived scores for one participant. Never stored; recomputed from the
/// current score sheet whenever it is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedScore {
    /// One result per configured panel, in panel order
    pub panels: Vec<PanelResult>,
    /// Mean of all pairwise-average panel results
    pub difficulty: Option<f64>,
    /// Difficulty plus every deduction panel, rounded to 3 places
    pub total: Option<f64>,
}

impl AggregatedScore {
    pub fn panel(&self, name: &str) -> Option<f64> {
        self.panels
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value)
    }

    pub fn is_complete(&self) -> bool {
        self.total.is_some()
    }
}

/// Compute panel results, difficulty and total from a score sheet.
///
/// Any missing input makes the dependent value absent. Nothing is ever
/// defaulted to zero and this function cannot fail.
pub fn aggregate(scores: &ScoreSheet, config: &ScoringConfig) -> AggregatedScore {
    let panels: Vec<PanelResult> = config
        .panels
        .iter()
        .map(|panel| {
            let entries: Vec<Option<f64>> = panel
                .seats
                .iter()
                .map(|seat| scores.get(seat).copied().flatten())
                .collect();
            PanelResult {
                name: panel.name.clone(),
                label: panel.label().to_string(),
                rule: panel.rule,
                value: panel.rule.apply(&entries),
            }
        })
        .collect();

    let difficulty = mean_all(
        panels
            .iter()
            .filter(|p| p.rule == AggregationRule::PairwiseAverage)
            .map(|p| p.value),
    );

    let deductions: Option<Vec<f64>> = panels
        .iter()
        .filter(|p| p.rule == AggregationRule::TrimmedMeanDeduction)
        .map(|p| p.value)
        .collect();

    let total = match (difficulty, deductions) {
        (Some(d), Some(parts)) => Some(round_to(d + parts.iter().sum::<f64>(), 3)),
        _ => None,
    };

    AggregatedScore {
        panels,
        difficulty,
        total,
    }
}

/// Mean of the values, absent if any is absent or there are none.
fn mean_all(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let values: Vec<f64> = values.collect::<Option<Vec<f64>>>()?;
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
