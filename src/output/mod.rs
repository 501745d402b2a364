pub mod formatter;

pub use formatter::{
    format_participant_detail, format_save_report, format_score, format_standings,
    format_standings_tsv, format_tournaments, should_use_colors,
};
