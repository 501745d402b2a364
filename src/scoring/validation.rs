use super::config::{AggregationRule, ScoringConfig};
use std::collections::HashSet;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let range = config.score_range;
    if !range.min.is_finite() || !range.max.is_finite() {
        errors.push("scoring.score_range: bounds must be finite".to_string());
    } else if range.min >= range.max {
        errors.push(format!(
            "scoring.score_range: min ({}) must be below max ({})",
            range.min, range.max
        ));
    }

    if !config
        .panels
        .iter()
        .any(|p| p.rule == AggregationRule::PairwiseAverage)
    {
        errors.push("scoring.panels: at least one pairwise-average panel is required".to_string());
    }

    let mut names = HashSet::new();
    let mut seats = HashSet::new();
    for (i, panel) in config.panels.iter().enumerate() {
        if panel.name.trim().is_empty() {
            errors.push(format!("scoring.panels[{}].name: must not be empty", i));
        } else if !names.insert(panel.name.as_str()) {
            errors.push(format!(
                "scoring.panels[{}].name: duplicate panel '{}'",
                i, panel.name
            ));
        }

        let expected = panel.rule.seat_count();
        if panel.seats.len() != expected {
            errors.push(format!(
                "scoring.panels[{}].seats: {:?} needs exactly {} seats, got {}",
                i,
                panel.rule,
                expected,
                panel.seats.len()
            ));
        }

        for (j, seat) in panel.seats.iter().enumerate() {
            if seat.as_str().trim().is_empty() {
                errors.push(format!("scoring.panels[{}].seats[{}]: must not be empty", i, j));
            } else if !seats.insert(seat.as_str()) {
                errors.push(format!(
                    "scoring.panels[{}].seats[{}]: seat '{}' is used more than once",
                    i, j, seat
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{PanelConfig, ScoreRange};

    #[test]
    fn test_default_config_valid() {
        assert!(validate_scoring(&ScoringConfig::default()).is_ok());
    }

    #[test]
    fn test_wrong_seat_count() {
        let config = ScoringConfig {
            score_range: ScoreRange::default(),
            panels: vec![
                PanelConfig::new("dv", "DV", AggregationRule::PairwiseAverage, &["DV-1", "DV-2"]),
                PanelConfig::new(
                    "e",
                    "E",
                    AggregationRule::TrimmedMeanDeduction,
                    &["E-1", "E-2", "E-3"],
                ),
            ],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.panels[1].seats"));
    }

    #[test]
    fn test_requires_pairwise_panel() {
        let config = ScoringConfig {
            score_range: ScoreRange::default(),
            panels: vec![PanelConfig::new(
                "e",
                "E",
                AggregationRule::TrimmedMeanDeduction,
                &["E-1", "E-2", "E-3", "E-4"],
            )],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("pairwise-average"));
    }

    #[test]
    fn test_duplicate_seat_across_panels() {
        let config = ScoringConfig {
            score_range: ScoreRange::default(),
            panels: vec![
                PanelConfig::new("a", "A", AggregationRule::PairwiseAverage, &["X-1", "X-2"]),
                PanelConfig::new("b", "B", AggregationRule::PairwiseAverage, &["X-2", "X-3"]),
            ],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.panels[1].seats[0]"));
    }

    #[test]
    fn test_collects_all_errors() {
        let config = ScoringConfig {
            score_range: ScoreRange { min: 10.0, max: 0.0 }, // Error 1
            panels: vec![
                PanelConfig::new("a", "A", AggregationRule::PairwiseAverage, &["X-1"]), // Error 2
                PanelConfig::new("a", "A", AggregationRule::PairwiseAverage, &["Y-1", "Y-2"]), // Error 3
            ],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_non_finite_range() {
        let config = ScoringConfig {
            score_range: ScoreRange {
                min: 0.0,
                max: f64::INFINITY,
            },
            ..ScoringConfig::default()
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("finite"));
    }
}
