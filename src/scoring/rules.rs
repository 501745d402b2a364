use super::config::AggregationRule;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of two entries, present only when both are.
pub fn pairwise_average(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        _ => None,
    }
}

/// Sort four deductions, drop the lowest and highest, and report
/// `10 - mean(middle two)` rounded to two places.
///
/// Absent when fewer than four entries are present.
pub fn trimmed_mean_deduction(entries: &[Option<f64>]) -> Option<f64> {
    let mut values: Vec<f64> = entries.iter().flatten().copied().collect();
    if values.len() < 4 {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let middle = &values[1..values.len() - 1];
    let avg = middle.iter().sum::<f64>() / middle.len() as f64;
    Some(round_to(10.0 - avg, 2))
}

impl AggregationRule {
    /// Apply this rule to a panel's seat entries (in seat order).
    pub fn apply(&self, entries: &[Option<f64>]) -> Option<f64> {
        if entries.len() != self.seat_count() {
            return None;
        }
        match self {
            AggregationRule::PairwiseAverage => pairwise_average(entries[0], entries[1]),
            AggregationRule::TrimmedMeanDeduction => trimmed_mean_deduction(entries),
        }
    }
}
