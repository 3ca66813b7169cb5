//! HTTP access to the Dialolical REST API.
//!
//! [`DialolicalApi`] is the seam the session driver talks to;
//! [`HttpApiClient`] is the reqwest-backed implementation. Every path is
//! rooted at `{base_url}/api`.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::BotConfig;
use crate::error::{DialolicalError, DialolicalResult};
use crate::models::{
    ApiKey, Conclusion, Dialogue, NewDialogue, NewParticipant, NewReaction, Participant,
    TurnReceipt, TurnSubmission,
};

#[async_trait]
pub trait DialolicalApi: Send + Sync {
    /// `POST /participants`
    async fn register_participant(&self, request: &NewParticipant)
        -> DialolicalResult<Participant>;

    /// `GET /dialogues`, in the order the service returns them.
    async fn list_dialogues(&self) -> DialolicalResult<Vec<Dialogue>>;

    /// `POST /dialogues/{id}/join`
    async fn join_dialogue(&self, dialogue_id: &str, key: &ApiKey) -> DialolicalResult<()>;

    /// `POST /dialogues`
    async fn create_dialogue(&self, request: &NewDialogue) -> DialolicalResult<Dialogue>;

    /// `GET /dialogues/{id}`
    async fn get_dialogue(&self, dialogue_id: &str) -> DialolicalResult<Dialogue>;

    /// `POST /dialogues/{id}/turns`
    async fn submit_turn(
        &self,
        dialogue_id: &str,
        submission: &TurnSubmission,
        key: &ApiKey,
    ) -> DialolicalResult<TurnReceipt>;

    /// `POST /reactions`
    async fn post_reaction(&self, reaction: &NewReaction, key: &ApiKey) -> DialolicalResult<()>;

    /// `POST /dialogues/{id}/conclude`
    async fn conclude_dialogue(
        &self,
        dialogue_id: &str,
        conclusion: &Conclusion,
        key: &ApiKey,
    ) -> DialolicalResult<()>;
}

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(config: &BotConfig) -> DialolicalResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("dialolical-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DialolicalError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config.base_url()))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> DialolicalResult<T> {
        debug!(method = "GET", %path, "Calling Dialolical API");
        let response = send(self.client.get(self.url(path))).await?;
        decode(response).await
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        key: Option<&ApiKey>,
    ) -> RequestBuilder {
        debug!(
            method = "POST",
            %path,
            authenticated = key.is_some(),
            "Calling Dialolical API"
        );
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(key) = key {
            request = request.header(AUTHORIZATION, key.bearer());
        }
        request
    }
}

async fn send(request: RequestBuilder) -> DialolicalResult<Response> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(DialolicalError::from_status(status, retry_after, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> DialolicalResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl DialolicalApi for HttpApiClient {
    async fn register_participant(
        &self,
        request: &NewParticipant,
    ) -> DialolicalResult<Participant> {
        let response = send(self.post("/participants", request, None)).await?;
        decode(response).await
    }

    async fn list_dialogues(&self) -> DialolicalResult<Vec<Dialogue>> {
        self.get("/dialogues").await
    }

    async fn join_dialogue(&self, dialogue_id: &str, key: &ApiKey) -> DialolicalResult<()> {
        let path = format!("/dialogues/{}/join", dialogue_id);
        send(self.post(&path, &serde_json::json!({}), Some(key))).await?;
        Ok(())
    }

    async fn create_dialogue(&self, request: &NewDialogue) -> DialolicalResult<Dialogue> {
        let response = send(self.post("/dialogues", request, None)).await?;
        decode(response).await
    }

    async fn get_dialogue(&self, dialogue_id: &str) -> DialolicalResult<Dialogue> {
        self.get(&format!("/dialogues/{}", dialogue_id)).await
    }

    async fn submit_turn(
        &self,
        dialogue_id: &str,
        submission: &TurnSubmission,
        key: &ApiKey,
    ) -> DialolicalResult<TurnReceipt> {
        let path = format!("/dialogues/{}/turns", dialogue_id);
        let response = send(self.post(&path, submission, Some(key))).await?;
        let bytes = response.bytes().await?;
        // The receipt is informational only; a body we cannot read is not an error.
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    async fn post_reaction(&self, reaction: &NewReaction, key: &ApiKey) -> DialolicalResult<()> {
        send(self.post("/reactions", reaction, Some(key))).await?;
        Ok(())
    }

    async fn conclude_dialogue(
        &self,
        dialogue_id: &str,
        conclusion: &Conclusion,
        key: &ApiKey,
    ) -> DialolicalResult<()> {
        let path = format!("/dialogues/{}/conclude", dialogue_id);
        send(self.post(&path, conclusion, Some(key))).await?;
        Ok(())
    }
}
