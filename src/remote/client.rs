use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, warn};

use super::repository::{ParticipantPayload, ParticipantRepository, RemoteParticipant, Tournament};
use crate::config::ApiConfig;
use crate::error::RemoteError;
use crate::participant::decode::extract_id;
use crate::participant::{RemoteId, TournamentId};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRIES: usize = 3;

/// Participant store reached over the tournament REST API.
#[derive(Clone, Debug)]
pub struct HttpRepository {
    client: reqwest::Client,
    base_url: String,
    retries: usize,
}

/// Create an HTTP repository from the `api` config section
pub fn create_client(api: &ApiConfig) -> Result<HttpRepository> {
    let timeout = match api.timeout.as_deref() {
        Some(t) => humantime::parse_duration(t)
            .with_context(|| format!("Invalid api.timeout '{}'", t))?,
        None => DEFAULT_TIMEOUT,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("judge-tally/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    Ok(HttpRepository {
        client,
        base_url: api.base_url.trim_end_matches('/').to_string(),
        retries: api.retries.unwrap_or(DEFAULT_RETRIES),
    })
}

#[derive(Deserialize)]
struct RawTournament {
    #[serde(rename = "_id", default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl HttpRepository {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with exponential backoff on transient failures. Reads only;
    /// writes are never retried behind the caller's back.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.url(path);
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.retries);

        RetryIf::spawn(
            retry_strategy,
            || {
                let client = self.client.clone();
                let url = url.clone();
                async move {
                    debug!(url = %url, "GET");
                    let response = client.get(&url).send().await?;
                    read_json(response).await
                }
            },
            |e: &RemoteError| {
                let transient = e.is_transient();
                if transient {
                    warn!(url = %url, error = %e, "Retrying after transient failure");
                }
                transient
            },
        )
        .await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let body = check_status(response).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(e.to_string()))
}

/// The store answers a create with the new document, an insert result or a
/// bare id depending on the deployment.
fn created_id(body: &serde_json::Value) -> Option<String> {
    if let Some(id) = extract_id(body) {
        return Some(id);
    }
    ["_id", "insertedId", "id"]
        .iter()
        .find_map(|key| body.get(*key).and_then(extract_id))
}

#[async_trait]
impl ParticipantRepository for HttpRepository {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, RemoteError> {
        let raw: Vec<RawTournament> = self.get_json("/tournaments").await?;
        Ok(raw
            .into_iter()
            .filter_map(|t| {
                let Some(id) = t.id.as_ref().and_then(extract_id) else {
                    warn!(name = ?t.name, "Skipping tournament without id");
                    return None;
                };
                Some(Tournament {
                    id: TournamentId(id),
                    name: t.name.unwrap_or_default(),
                    date: t.date.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn list_participants(
        &self,
        tournament: &TournamentId,
    ) -> Result<Vec<RemoteParticipant>, RemoteError> {
        self.get_json(&format!("/tournaments/{}/participants", tournament))
            .await
    }

    async fn create_participant(
        &self,
        tournament: &TournamentId,
        record: &ParticipantPayload,
    ) -> Result<RemoteId, RemoteError> {
        let url = self.url(&format!("/tournaments/{}/participants/add", tournament));
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(record).send().await?;
        let body: serde_json::Value = read_json(response).await?;
        created_id(&body)
            .map(RemoteId)
            .ok_or_else(|| RemoteError::Malformed(format!("create response has no id: {}", body)))
    }

    async fn update_participant(
        &self,
        id: &RemoteId,
        record: &ParticipantPayload,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!("/tournaments/participants/{}", id));
        debug!(url = %url, "PUT");
        let response = self.client.put(&url).json(record).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete_participant(&self, id: &RemoteId) -> Result<(), RemoteError> {
        let url = self.url(&format!("/tournaments/participants/{}", id));
        debug!(url = %url, "DELETE");
        let response = self.client.delete(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
