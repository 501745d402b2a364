use std::cmp::Ordering;

use super::config::ScoringConfig;
use super::engine::{aggregate, AggregatedScore};
use crate::participant::Participant;

/// A participant paired with its freshly computed score and place.
#[derive(Debug, Clone)]
pub struct Standing<'a> {
    /// 1-based; `None` while the total is absent
    pub place: Option<usize>,
    pub participant: &'a Participant,
    pub score: AggregatedScore,
}

/// Order participants by total descending. Absent totals go last; ties are
/// broken by name, then by local id. Tied totals share a place.
pub fn rank<'a>(participants: &'a [Participant], config: &ScoringConfig) -> Vec<Standing<'a>> {
    let mut scored: Vec<(&Participant, AggregatedScore)> = participants
        .iter()
        .map(|p| (p, aggregate(&p.scores, config)))
        .collect();

    scored.sort_by(|a, b| {
        let total_cmp = match (a.1.total, b.1.total) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if total_cmp != Ordering::Equal {
            return total_cmp;
        }
        a.0.details
            .full_name
            .cmp(&b.0.details.full_name)
            .then(a.0.local_id.cmp(&b.0.local_id))
    });

    let mut standings = Vec::with_capacity(scored.len());
    let mut previous: Option<(f64, usize)> = None;
    for (idx, (participant, score)) in scored.into_iter().enumerate() {
        let place = score.total.map(|total| match previous {
            Some((prev_total, prev_place)) if prev_total == total => prev_place,
            _ => idx + 1,
        });
        if let (Some(total), Some(place)) = (score.total, place) {
            previous = Some((total, place));
        }
        standings.push(Standing {
            place,
            participant,
            score,
        });
    }
    standings
}
