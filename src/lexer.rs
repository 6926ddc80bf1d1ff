//! Word segmentation with named-entity tags.

use std::future::Future;

use log::debug;
use serde::Deserialize;

use crate::error::{BotError, Result};
use crate::types::EntityType;

const LTP_CLOUD_API_URL: &str = "https://api.ltp-cloud.com/analysis/";

/// A single token of lexed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub entity: Option<EntityType>,
}

impl Word {
    pub fn new(text: impl Into<String>, entity: Option<EntityType>) -> Self {
        Self {
            text: text.into(),
            entity,
        }
    }
}

/// Words of one paragraph, in order.
pub type Paragraph = Vec<Word>;

/// Splits text into tagged words.
pub trait Lexer: Send + Sync {
    fn lex(&self, text: &str) -> impl Future<Output = Result<Vec<Paragraph>>> + Send;
}

/// A word as returned by the LTP cloud analysis API.
#[derive(Debug, Deserialize)]
struct LtpWord {
    cont: String,
    #[serde(default)]
    pos: String,
    #[serde(default)]
    ne: String,
}

impl LtpWord {
    /// Maps LTP tags onto entity types.
    ///
    /// NE tags come as `S-Ns`, `B-Ni`, ... with `O` for none. LTP has no time
    /// entity, so temporal nouns (`nt`) stand in for it.
    fn entity(&self) -> Option<EntityType> {
        let kind = self.ne.rsplit('-').next().unwrap_or_default();
        match kind {
            "Ns" => Some(EntityType::Location),
            "Nh" => Some(EntityType::Person),
            "Ni" => Some(EntityType::Organization),
            _ if self.pos == "nt" => Some(EntityType::Time),
            _ => None,
        }
    }
}

/// Client for the LTP cloud lexer.
pub struct LtpLexer {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl LtpLexer {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_api_url(api_key, LTP_CLOUD_API_URL.to_string())
    }

    #[must_use]
    pub fn with_api_url(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

impl Lexer for LtpLexer {
    async fn lex(&self, text: &str) -> Result<Vec<Paragraph>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Lexing {} characters with LTP cloud", text.chars().count());

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("text", text),
                ("pattern", "ner"),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(BotError::Lexer(format!("LTP cloud returned {status}")));
        }

        // paragraphs -> sentences -> words
        let body: Vec<Vec<Vec<LtpWord>>> = serde_json::from_str(&response.text().await?)?;

        Ok(body
            .into_iter()
            .map(|paragraph| {
                paragraph
                    .into_iter()
                    .flatten()
                    .map(|word| {
                        let entity = word.entity();
                        Word::new(word.cont, entity)
                    })
                    .collect()
            })
            .collect())
    }
}
