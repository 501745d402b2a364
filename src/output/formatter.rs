use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::participant::{Field, Participant, SyncState};
use crate::remote::Tournament;
use crate::scoring::{AggregatedScore, ScoringConfig, Standing};
use crate::sync::{SaveOutcome, SaveReport};

/// Placeholder shown wherever a score is absent
pub const ABSENT: &str = "—";

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with up to three decimals, keeping at least two
/// ("17.95", "17.933", "10.00"). Absent scores render as a dash.
pub fn format_score(score: Option<f64>) -> String {
    let Some(value) = score else {
        return ABSENT.to_string();
    };
    let formatted = format!("{:.3}", value);
    match formatted.strip_suffix('0') {
        Some(trimmed) => trimmed.to_string(),
        None => formatted,
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

fn pad_right(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

fn pad_left(text: &str, width: usize) -> String {
    format!("{:>width$}", text, width = width)
}

/// Format standings as a table: place, name, one column per panel,
/// difficulty and total. Unsaved rows are marked with `*`.
pub fn format_standings(
    standings: &[Standing],
    config: &ScoringConfig,
    use_colors: bool,
) -> String {
    if standings.is_empty() {
        return "No participants found.".to_string();
    }

    let score_width = 7;
    let place_width = 4;
    let separator = "  ";

    let panel_columns = config.panels.len() + 2;
    let fixed_width = place_width + 1 + (score_width + separator.len()) * panel_columns;
    let longest_name = standings
        .iter()
        .map(|s| s.participant.display_name().chars().count() + 1)
        .max()
        .unwrap_or(0);
    let name_width = match get_terminal_width() {
        Some(width) if width > fixed_width + 10 => longest_name.min(width - fixed_width),
        Some(_) => longest_name.min(20),
        None => longest_name,
    }
    .max(4);

    let mut header = format!("{} {}", pad_left("#", place_width), pad_right("Name", name_width));
    for panel in &config.panels {
        header.push_str(separator);
        header.push_str(&pad_left(panel.label(), score_width));
    }
    header.push_str(separator);
    header.push_str(&pad_left("D", score_width));
    header.push_str(separator);
    header.push_str(&pad_left("Total", score_width));

    let mut lines = Vec::with_capacity(standings.len() + 1);
    lines.push(if use_colors {
        header.bold().to_string()
    } else {
        header
    });

    for standing in standings {
        let place = match standing.place {
            Some(place) => format!("{}.", place),
            None => String::new(),
        };
        let mut name = standing.participant.display_name();
        if standing.participant.state.needs_save() {
            name.push('*');
        }
        let name = pad_right(&truncate_name(&name, name_width), name_width);

        let mut cells = String::new();
        for panel in &standing.score.panels {
            cells.push_str(separator);
            cells.push_str(&pad_left(&format_score(panel.value), score_width));
        }
        cells.push_str(separator);
        cells.push_str(&pad_left(&format_score(standing.score.difficulty), score_width));
        cells.push_str(separator);
        let total = pad_left(&format_score(standing.score.total), score_width);

        if use_colors {
            lines.push(format!(
                "{} {}{}{}",
                pad_left(&place, place_width).dimmed(),
                name,
                cells,
                total.bold()
            ));
        } else {
            lines.push(format!("{} {}{}{}", pad_left(&place, place_width), name, cells, total));
        }
    }

    lines.join("\n")
}

/// Format standings as tab-separated values for scripting
/// Columns: place, name, apparatus, panel results..., difficulty, total
/// (no headers, no colors, absent values as empty fields)
pub fn format_standings_tsv(standings: &[Standing]) -> String {
    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    standings
        .iter()
        .map(|s| {
            let mut fields = vec![
                s.place.map(|p| p.to_string()).unwrap_or_default(),
                s.participant.details.full_name.clone(),
                s.participant.details.apparatus.clone(),
            ];
            fields.extend(s.score.panels.iter().map(|p| cell(p.value)));
            fields.push(cell(s.score.difficulty));
            fields.push(cell(s.score.total));
            fields.join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format one participant with every field, every seat and the derived scores
pub fn format_participant_detail(
    participant: &Participant,
    score: &AggregatedScore,
    config: &ScoringConfig,
    use_colors: bool,
) -> String {
    let title = format!("{} ({})", participant.display_name(), participant.local_id);
    let mut lines = vec![if use_colors {
        title.bold().to_string()
    } else {
        title
    }];

    for field in Field::ALL {
        let value = participant.details.get(field);
        if !value.is_empty() {
            lines.push(format!("  {}: {}", field.name(), value));
        }
    }
    if let Some(remote_id) = &participant.remote_id {
        lines.push(format!("  id: {}", remote_id));
    }
    lines.push(format!("  state: {}", format_state(participant.state, use_colors)));

    for (panel, result) in config.panels.iter().zip(&score.panels) {
        let seats = panel
            .seats
            .iter()
            .map(|seat| format!("{} {}", seat, format_score(participant.score(seat))))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "  {}: {}  [{}]",
            panel.label(),
            format_score(result.value),
            seats
        ));
    }
    lines.push(format!("  D: {}", format_score(score.difficulty)));
    let total = format_score(score.total);
    if use_colors {
        lines.push(format!("  Total: {}", total.bold()));
    } else {
        lines.push(format!("  Total: {}", total));
    }

    lines.join("\n")
}

fn format_state(state: SyncState, use_colors: bool) -> String {
    if !use_colors {
        return state.to_string();
    }
    match state {
        SyncState::Clean => state.green().to_string(),
        SyncState::Dirty => state.yellow().to_string(),
        SyncState::New => state.cyan().to_string(),
    }
}

/// Format the result of a batch save as one line per record, then a summary
pub fn format_save_report(report: &SaveReport, use_colors: bool) -> String {
    if report.is_empty() {
        return "Nothing to save.".to_string();
    }

    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|(id, result)| match result {
            Ok(SaveOutcome::Created(remote_id)) => format!("{} created as {}", id, remote_id),
            Ok(SaveOutcome::Updated) => format!("{} updated", id),
            Err(e) if use_colors => format!("{} {} {}", id, "failed:".red(), e),
            Err(e) => format!("{} failed: {}", id, e),
        })
        .collect();

    let failed = report.failures().count();
    let summary = format!("{} saved, {} failed", report.len() - failed, failed);
    lines.push(if use_colors && failed > 0 {
        summary.yellow().to_string()
    } else {
        summary
    });
    lines.join("\n")
}

/// Format tournaments as one line each: "{id}  {date}  {name}"
pub fn format_tournaments(tournaments: &[Tournament], use_colors: bool) -> String {
    if tournaments.is_empty() {
        return "No tournaments found.".to_string();
    }

    tournaments
        .iter()
        .map(|t| {
            let date = if t.date.is_empty() { ABSENT } else { t.date.as_str() };
            if use_colors {
                format!("{}  {}  {}", t.id.dimmed(), date.cyan(), t.name.bold())
            } else {
                format!("{}  {}  {}", t.id, date, t.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
