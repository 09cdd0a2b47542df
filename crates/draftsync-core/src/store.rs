//! Remote draft store client.
//!
//! The store is an idempotent upsert keyed by owner: it accepts whatever
//! draft arrives, including one whose `updated_at` is older than what it
//! already holds. Ordering is the sync engine's responsibility
//! (last-write-wins), not the store's.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Draft, OwnerId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid draft store configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Draft store HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Draft store API error: {0}")]
    Api(String),
    #[error("Invalid draft store payload: {0}")]
    InvalidPayload(String),
    #[error("Draft store unreachable: {0}")]
    Unreachable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Acknowledgement of an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StoreAck {
    /// When the store accepted the write (unix ms)
    pub accepted_at: i64,
}

/// Remote draft store consumed by the sync engine.
pub trait DraftStore: Send + Sync {
    /// Idempotent upsert of the owner's draft.
    fn save_draft(&self, draft: Draft) -> impl Future<Output = StoreResult<StoreAck>> + Send;

    /// Fetch the owner's stored draft, if any. Used only by cross-device
    /// resume flows; same-device reload hydrates from the local slot.
    fn load_draft(
        &self,
        owner_id: &OwnerId,
    ) -> impl Future<Output = StoreResult<Option<Draft>>> + Send;
}

/// HTTP implementation of the draft store API.
#[derive(Clone)]
pub struct HttpDraftStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpDraftStore {
    pub fn new(endpoint: impl Into<String>) -> StoreResult<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().build()?,
        })
    }

    fn draft_url(&self, owner_id: &OwnerId) -> String {
        format!("{}/v1/drafts/{}", self.endpoint, owner_id)
    }
}

impl DraftStore for HttpDraftStore {
    async fn save_draft(&self, draft: Draft) -> StoreResult<StoreAck> {
        let response = self
            .client
            .put(self.draft_url(&draft.owner_id))
            .header("Accept", "application/json")
            .json(&draft)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(parse_api_error(status, &body)));
        }

        let ack = response.json::<StoreAck>().await?;
        if ack.accepted_at <= 0 {
            return Err(StoreError::InvalidPayload(
                "accepted_at must be a positive unix-ms timestamp".to_string(),
            ));
        }
        Ok(ack)
    }

    async fn load_draft(&self, owner_id: &OwnerId) -> StoreResult<Option<Draft>> {
        let response = self
            .client
            .get(self.draft_url(owner_id))
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(parse_api_error(status, &body)));
        }

        Ok(Some(response.json::<Draft>().await?))
    }
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<StoreErrorBody>(body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .or_else(|| {
            let raw = body.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        });

    detail.map_or_else(
        || format!("HTTP {}", status.as_u16()),
        |detail| format!("{detail} ({})", status.as_u16()),
    )
}

fn normalize_endpoint(raw: String) -> StoreResult<String> {
    let endpoint = raw.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Err(StoreError::InvalidConfiguration(
            "endpoint must not be empty".to_string(),
        ));
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(StoreError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ));
    }
    Ok(endpoint.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
    }

    #[test]
    fn normalize_endpoint_strips_trailing_slash() {
        assert_eq!(
            normalize_endpoint("https://api.example.com/".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn draft_url_is_owner_scoped() {
        let store = HttpDraftStore::new("https://api.example.com").unwrap();
        assert_eq!(
            store.draft_url(&OwnerId::new("op-1")),
            "https://api.example.com/v1/drafts/op-1"
        );
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let message = parse_api_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"message": "draft payload malformed"}"#,
        );
        assert_eq!(message, "draft payload malformed (400)");
    }

    #[test]
    fn parse_api_error_ignores_a_blank_structured_message() {
        let message = parse_api_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message": "  "}"#,
        );
        assert_eq!(message, r#"{"message": "  "} (500)"#);
    }

    #[test]
    fn parse_api_error_falls_back_to_raw_body() {
        let message = parse_api_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(message, "upstream down (502)");

        let empty = parse_api_error(reqwest::StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(empty, "HTTP 502");
    }
}
