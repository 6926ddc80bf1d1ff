//! Client for the Tuling robot open API (v2).

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const TULING_API_URL: &str = "https://openapi.tuling123.com/openapi/api/v2";

/// Intent code meaning the key has no requests left today.
const QUOTA_EXCEEDED_CODE: i64 = 4003;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TulingRequest<'a> {
    req_type: u8,
    perception: Perception<'a>,
    user_info: UserInfo<'a>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
enum Perception<'a> {
    InputText { text: &'a str },
    InputImage { url: &'a str },
}

impl Perception<'_> {
    fn req_type(&self) -> u8 {
        match self {
            Perception::InputText { .. } => 0,
            Perception::InputImage { .. } => 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo<'a> {
    api_key: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TulingResponse {
    intent: Intent,
    #[serde(default)]
    results: Vec<TulingResult>,
}

#[derive(Debug, Deserialize)]
struct Intent {
    code: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TulingResult {
    result_type: String,
    #[serde(default)]
    values: HashMap<String, serde_json::Value>,
}

impl TulingResult {
    /// The relayable value of a `text` or `url` result.
    fn relayable_value(&self) -> Option<String> {
        match self.result_type.as_str() {
            kind @ ("text" | "url") => self
                .values
                .get(kind)
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
            _ => None,
        }
    }
}

/// What a single key produced for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    /// The API produced results. Only text and URL values are kept, so this
    /// may be empty when every result was of another kind.
    Answered(Vec<String>),
    /// The key has used up its daily quota.
    QuotaExceeded,
    /// No results at all, or the request failed.
    Unusable,
}

/// Classifies a raw response body.
fn classify_body(body: &str) -> Result<CredentialOutcome> {
    let response: TulingResponse = serde_json::from_str(body)?;

    if response.intent.code == QUOTA_EXCEEDED_CODE {
        return Ok(CredentialOutcome::QuotaExceeded);
    }

    if response.results.is_empty() {
        debug!(
            "Tuling intent {} returned no results",
            response.intent.code
        );
        return Ok(CredentialOutcome::Unusable);
    }

    Ok(CredentialOutcome::Answered(
        response
            .results
            .iter()
            .filter_map(TulingResult::relayable_value)
            .collect(),
    ))
}

/// Hashes a host identity into the alphanumeric id the API expects.
fn hashed_identity(identity: &str) -> String {
    format!("{:x}", md5::compute(identity.as_bytes()))
}

/// Chatbot client rotating over an ordered key pool.
pub struct TulingClient {
    api_keys: Vec<String>,
    api_url: String,
    client: reqwest::Client,
}

impl TulingClient {
    #[must_use]
    pub fn new(api_keys: Vec<String>) -> Self {
        Self::with_api_url(api_keys, TULING_API_URL.to_string())
    }

    #[must_use]
    pub fn with_api_url(api_keys: Vec<String>, api_url: String) -> Self {
        Self {
            api_keys,
            api_url,
            client: reqwest::Client::new(),
        }
    }

    /// Sends text, or the first image when there is no text, to the chatbot.
    ///
    /// Keys are tried in order until one answers. Failures are logged and
    /// never returned; an empty vector means nobody answered.
    pub async fn call(
        &self,
        text: Option<&str>,
        images: &[String],
        user_id: &str,
        group_id: Option<&str>,
    ) -> Vec<String> {
        let perception = match (text.map(str::trim).filter(|t| !t.is_empty()), images.first()) {
            (Some(text), _) => Perception::InputText { text },
            (None, Some(url)) => Perception::InputImage { url },
            (None, None) => {
                debug!("Nothing to send to Tuling");
                return Vec::new();
            }
        };

        let user_id = hashed_identity(user_id);
        let group_id = group_id.map(hashed_identity);

        for (index, api_key) in self.api_keys.iter().enumerate() {
            let request = TulingRequest {
                req_type: perception.req_type(),
                perception,
                user_info: UserInfo {
                    api_key,
                    user_id: &user_id,
                    group_id: group_id.as_deref(),
                },
            };

            match self.send(&request).await {
                Ok(CredentialOutcome::Answered(values)) => {
                    debug!(
                        "Tuling key #{index} answered with {} results",
                        values.len()
                    );
                    return values;
                }
                Ok(CredentialOutcome::QuotaExceeded) => {
                    debug!("Tuling key #{index} is out of quota, rotating");
                }
                Ok(CredentialOutcome::Unusable) => {
                    debug!("Tuling key #{index} produced nothing usable, rotating");
                }
                Err(e) => {
                    warn!("Tuling request with key #{index} failed: {e}");
                }
            }
        }

        debug!("All {} Tuling keys exhausted", self.api_keys.len());
        Vec::new()
    }

    async fn send(&self, request: &TulingRequest<'_>) -> Result<CredentialOutcome> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Tuling API returned status {}", response.status());
            return Ok(CredentialOutcome::Unusable);
        }

        classify_body(&response.text().await?)
    }
}
