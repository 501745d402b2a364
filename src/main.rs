use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use judge_tally::error::SyncError;
use judge_tally::participant::{Field, JudgeId, LocalId, RemoteId, TournamentId};
use judge_tally::remote::HttpRepository;
use judge_tally::sync::ParticipantSyncManager;
use judge_tally::{config, import, logging, output, scoring};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_VALIDATION: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tournaments known to the server
    Tournaments,
    /// Show participants ranked by total score
    Standings {
        tournament: String,
        /// Only participants performing on this apparatus
        #[arg(short, long)]
        apparatus: Option<String>,
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Register a new participant
    Add {
        tournament: String,
        /// Field to set, e.g. --set name="Anna Petrova" --set apparatus=Hoop
        #[arg(short = 's', long = "set", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
        /// Judge score, e.g. --grade Е-1=1.2
        #[arg(short = 'g', long = "grade", value_name = "SEAT=SCORE")]
        grades: Vec<String>,
    },
    /// Show or edit one participant's details and scores
    Score {
        tournament: String,
        /// Participant id as stored on the server
        participant: String,
        #[arg(short = 's', long = "set", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
        /// Judge score; an empty value or "-" clears it
        #[arg(short = 'g', long = "grade", value_name = "SEAT=SCORE")]
        grades: Vec<String>,
    },
    /// Remove a participant
    Delete {
        tournament: String,
        participant: String,
    },
    /// Add or update participants from a YAML roster and save them
    Import {
        tournament: String,
        file: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "judge-tally")]
#[command(about = "Judge score entry and standings for gymnastics tournaments", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/judge-tally/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

type Manager = ParticipantSyncManager<HttpRepository>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let start_time = Instant::now();

    let config_path = cli.config.map(PathBuf::from);
    let config = match config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate scoring config at startup
    let effective_scoring = config.scoring();
    if let Err(errors) = scoring::validate_scoring(&effective_scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let repository = match judge_tally::remote::create_client(&config.api) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let manager = ParticipantSyncManager::new(repository, Arc::new(effective_scoring))
        .with_apparatuses(config.apparatuses());
    let use_colors = output::should_use_colors();

    let code = run(cli.command, &manager, use_colors).await;
    debug!(elapsed = ?start_time.elapsed(), code, "Done");
    std::process::exit(code);
}

async fn run(command: Commands, manager: &Manager, use_colors: bool) -> i32 {
    match command {
        Commands::Tournaments => match manager.list_tournaments().await {
            Ok(tournaments) => {
                println!("{}", output::format_tournaments(&tournaments, use_colors));
                EXIT_SUCCESS
            }
            Err(e) => report_error(&e),
        },
        Commands::Standings {
            tournament,
            apparatus,
            tsv,
        } => {
            if let Err(code) = load(manager, &tournament).await {
                return code;
            }
            let mut participants = manager.snapshot();
            if let Some(apparatus) = apparatus {
                participants.retain(|p| p.details.apparatus.eq_ignore_ascii_case(&apparatus));
            }
            let standings = scoring::rank(&participants, manager.scoring());
            if tsv {
                println!("{}", output::format_standings_tsv(&standings));
            } else {
                println!(
                    "{}",
                    output::format_standings(&standings, manager.scoring(), use_colors)
                );
            }
            EXIT_SUCCESS
        }
        Commands::Add {
            tournament,
            fields,
            grades,
        } => {
            let (fields, grades) = match parse_edits(&fields, &grades) {
                Ok(edits) => edits,
                Err(e) => return usage_error(&e),
            };
            if let Err(code) = load(manager, &tournament).await {
                return code;
            }
            let id = manager.add_blank();
            if let Err(e) = manager.apply_edits(id, &fields, &grades) {
                return report_error(&e);
            }
            save_and_show(manager, id, use_colors).await
        }
        Commands::Score {
            tournament,
            participant,
            fields,
            grades,
        } => {
            let (fields, grades) = match parse_edits(&fields, &grades) {
                Ok(edits) => edits,
                Err(e) => return usage_error(&e),
            };
            if let Err(code) = load(manager, &tournament).await {
                return code;
            }
            let id = match find(manager, &participant) {
                Ok(id) => id,
                Err(code) => return code,
            };
            if fields.is_empty() && grades.is_empty() {
                return show(manager, id, use_colors);
            }
            if let Err(e) = manager.apply_edits(id, &fields, &grades) {
                return report_error(&e);
            }
            save_and_show(manager, id, use_colors).await
        }
        Commands::Delete {
            tournament,
            participant,
        } => {
            if let Err(code) = load(manager, &tournament).await {
                return code;
            }
            let id = match find(manager, &participant) {
                Ok(id) => id,
                Err(code) => return code,
            };
            match manager.delete_one(id).await {
                Ok(_) => {
                    println!("Deleted {}", participant);
                    EXIT_SUCCESS
                }
                Err(e) => report_error(&e),
            }
        }
        Commands::Import { tournament, file } => {
            let roster = match import::load_roster(&file) {
                Ok(r) => r,
                Err(e) => return usage_error(&format!("{:#}", e)),
            };
            if let Err(code) = load(manager, &tournament).await {
                return code;
            }
            let summary = import::import_roster(manager, &roster).await;
            for (index, e) in &summary.rejected {
                eprintln!("Entry {} skipped: {}", index + 1, e);
            }
            println!("{}", output::format_save_report(&summary.report, use_colors));
            if summary.is_complete() {
                EXIT_SUCCESS
            } else if summary.report.failures().any(|(_, e)| e.is_remote()) {
                EXIT_NETWORK
            } else {
                EXIT_VALIDATION
            }
        }
    }
}

async fn load(manager: &Manager, tournament: &str) -> Result<(), i32> {
    let tournament = TournamentId(tournament.trim().to_string());
    match manager.load(&tournament).await {
        Ok(count) => {
            info!(tournament = %tournament, count, "Working set ready");
            Ok(())
        }
        Err(e) => Err(report_error(&e)),
    }
}

fn find(manager: &Manager, participant: &str) -> Result<LocalId, i32> {
    manager
        .find_remote(&RemoteId(participant.trim().to_string()))
        .ok_or_else(|| usage_error(&format!("No participant with id '{}'", participant)))
}

async fn save_and_show(manager: &Manager, id: LocalId, use_colors: bool) -> i32 {
    if let Err(e) = manager.save_one(id).await {
        return report_error(&e);
    }
    show(manager, id, use_colors)
}

fn show(manager: &Manager, id: LocalId, use_colors: bool) -> i32 {
    let (Some(participant), Ok(score)) = (manager.get(id), manager.aggregate(id)) else {
        return report_error(&SyncError::NotFound(id));
    };
    println!(
        "{}",
        output::format_participant_detail(&participant, &score, manager.scoring(), use_colors)
    );
    EXIT_SUCCESS
}

fn report_error(e: &SyncError) -> i32 {
    error!("{}", e);
    if e.is_remote() {
        EXIT_NETWORK
    } else {
        EXIT_VALIDATION
    }
}

fn usage_error(message: &str) -> i32 {
    error!("{}", message);
    EXIT_VALIDATION
}

type Edits = (Vec<(Field, String)>, Vec<(JudgeId, Option<f64>)>);

/// Parse `FIELD=VALUE` and `SEAT=SCORE` arguments
fn parse_edits(fields: &[String], grades: &[String]) -> Result<Edits, String> {
    let fields = fields
        .iter()
        .map(|arg| {
            let (name, value) = split_assignment(arg)?;
            let field: Field = name.parse().map_err(|e| format!("{}", e))?;
            Ok((field, value.to_string()))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let grades = grades
        .iter()
        .map(|arg| {
            let (seat, value) = split_assignment(arg)?;
            let value = match value.trim() {
                "" | "-" => None,
                v => Some(
                    v.replace(',', ".")
                        .parse::<f64>()
                        .map_err(|_| format!("Score '{}' for {} is not a number", v, seat))?,
                ),
            };
            Ok((JudgeId::new(seat.trim()), value))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok((fields, grades))
}

fn split_assignment(arg: &str) -> Result<(&str, &str), String> {
    arg.split_once('=')
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_edits() {
        let (fields, grades) = parse_edits(
            &args(&["name=Anna Petrova", "club=Olimp"]),
            &args(&["Е-1=1,2", "ДВ-1=8.5", "А-2=-", "А-3="]),
        )
        .unwrap();

        assert_eq!(
            fields,
            vec![
                (Field::FullName, "Anna Petrova".to_string()),
                (Field::School, "Olimp".to_string()),
            ]
        );
        assert_eq!(grades[0], (JudgeId::new("Е-1"), Some(1.2)));
        assert_eq!(grades[1], (JudgeId::new("ДВ-1"), Some(8.5)));
        assert_eq!(grades[2], (JudgeId::new("А-2"), None));
        assert_eq!(grades[3], (JudgeId::new("А-3"), None));
    }

    #[test]
    fn test_parse_edits_errors() {
        assert!(parse_edits(&args(&["nickname=x"]), &[]).is_err());
        assert!(parse_edits(&args(&["name"]), &[]).is_err());
        assert!(parse_edits(&[], &args(&["Е-1=high"])).is_err());
    }

    #[test]
    fn test_cli_parses_import() {
        let cli = Cli::try_parse_from(["judge-tally", "-v", "import", "t1", "roster.yaml"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Import { ref tournament, .. } if tournament == "t1"));
    }
}
