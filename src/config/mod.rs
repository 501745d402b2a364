mod schema;

pub use schema::{ApiConfig, Config};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/judge-tally/)
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("judge-tally")
}

/// Get the default config file path (~/.config/judge-tally/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Create it with at least an api.base_url entry",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(serde_saphyr::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::AggregationRule;

    #[test]
    fn test_minimal_config_uses_default_scoring() {
        let config = parse_config("api:\n  base_url: http://localhost:2017\n").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:2017");
        assert!(config.api.timeout.is_none());
        assert!(config.apparatuses().is_empty());
        assert_eq!(config.scoring().panels.len(), 4);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
api:
  base_url: https://scores.example.org
  timeout: 30s
  retries: 5
apparatuses: [Hoop, Ball, Clubs, Ribbon]
scoring:
  score_range:
    min: 0.0
    max: 20.0
  panels:
    - name: difficulty
      rule: pairwise-average
      seats: [D-1, D-2]
    - name: execution
      label: E
      rule: trimmed-mean-deduction
      seats: [E-1, E-2, E-3, E-4]
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.api.retries, Some(5));
        assert_eq!(config.apparatuses()[0], "Hoop");
        let scoring = config.scoring();
        assert_eq!(scoring.score_range.max, 20.0);
        assert_eq!(scoring.panels[1].rule, AggregationRule::TrimmedMeanDeduction);
        assert_eq!(scoring.panels[1].label(), "E");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let yaml = "api:\n  base_url: http://localhost\n  token: secret\n";
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(PathBuf::from("/nonexistent/judge-tally.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_config_path_under_app_dir() {
        let path = get_config_path();
        assert!(path.ends_with("judge-tally/config.yaml"));
    }
}
