use serde::{Deserialize, Serialize};

use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    /// Allowed apparatus values; the first is the default for new entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparatuses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringConfig>,
}

impl Config {
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    pub fn apparatuses(&self) -> Vec<String> {
        self.apparatuses.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout in humantime form, e.g. "10s" or "1m 30s".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Attempts for read requests after the first one fails transiently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<usize>,
}
