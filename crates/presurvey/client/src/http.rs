//! reqwest-backed collaborators

use std::time::Duration;

use async_trait::async_trait;
use presurvey_gate::{MembershipList, ParticipantDataClient, ProgramRegistry};
use presurvey_types::{PresurveyResult, Program, ProgressRecord, ProjectCohort, Survey};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client(timeout: Duration) -> ClientResult<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Client for the program registry and participant data API
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
        })
    }

    /// `{base}/api/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await?;
        handle_response(response).await
    }
}

#[async_trait]
impl ProgramRegistry for ApiClient {
    async fn get_program(&self, label: &str) -> PresurveyResult<Program> {
        let url = self
            .endpoint(&["programs", label])
            .map_err(|e| e.for_entity("program", label))?;
        self.get(url)
            .await
            .map_err(|e| e.for_entity("program", label))
    }

    async fn get_cohort(&self, code: &str) -> PresurveyResult<ProjectCohort> {
        let url = self
            .endpoint(&["participation", code])
            .map_err(|e| e.for_entity("project cohort", code))?;
        self.get(url)
            .await
            .map_err(|e| e.for_entity("project cohort", code))
    }

    async fn get_survey(&self, project_cohort_id: &str, ordinal: u32) -> PresurveyResult<Survey> {
        let id = format!("{project_cohort_id}#{ordinal}");
        let ordinal = ordinal.to_string();
        let url = self
            .endpoint(&["project_cohorts", project_cohort_id, "surveys", ordinal.as_str()])
            .map_err(|e| e.for_entity("survey", id.clone()))?;
        self.get(url).await.map_err(|e| e.for_entity("survey", id))
    }
}

#[async_trait]
impl ParticipantDataClient for ApiClient {
    async fn get_progress(&self, token: &str, code: &str) -> PresurveyResult<Vec<ProgressRecord>> {
        let mut url = self
            .endpoint(&["participants", token, "progress"])
            .map_err(|e| e.for_entity("participant progress", token))?;
        url.query_pairs_mut().append_pair("code", code);
        self.get(url)
            .await
            .map_err(|e| e.for_entity("participant progress", token))
    }
}

/// The static list of salted participant hashes
#[derive(Clone, Debug)]
pub struct HashedIdList {
    client: Client,
    url: Url,
}

impl HashedIdList {
    pub fn new(url: &str, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: Url::parse(url)?,
        })
    }

    async fn fetch(&self) -> ClientResult<Vec<String>> {
        let response = self.client.get(self.url.clone()).send().await?;
        handle_response(response).await
    }
}

#[async_trait]
impl MembershipList for HashedIdList {
    async fn fetch_hashed_ids(&self) -> PresurveyResult<Vec<String>> {
        let ids = self
            .fetch()
            .await
            .map_err(|e| e.for_entity("hashed id list", self.url.as_str()))?;
        debug!(count = ids.len(), "Hashed id list fetched");
        Ok(ids)
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();

    if status.is_success() {
        Ok(response.json().await?)
    } else if status == StatusCode::NOT_FOUND {
        Err(ClientError::NotFound(response.url().path().to_string()))
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
