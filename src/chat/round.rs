//! One round of chatting: ask the chatbot, relay what it says.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};

use crate::entity::{KeywordTable, infer_entity_type};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::tuling::TulingClient;
use crate::types::{ChatMessage, Conversation, EntityType};

use super::expressions::{I_DONT_UNDERSTAND, render};

/// Pause between relayed messages so the channel is not flooded.
const RELAY_DELAY: Duration = Duration::from_millis(800);

/// Where round output goes.
pub trait Outbound: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Signals that a reply is on its way. Best effort.
    fn typing(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// What a round produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub replies: Vec<String>,
    /// Follow-up kind registered for the context, if any.
    pub expected: Option<EntityType>,
}

pub struct Chatbot {
    client: TulingClient,
    keywords: KeywordTable,
    relay_delay: Duration,
}

impl Chatbot {
    #[must_use]
    pub fn new(client: TulingClient, keywords: KeywordTable) -> Self {
        Self {
            client,
            keywords,
            relay_delay: RELAY_DELAY,
        }
    }

    #[must_use]
    pub fn with_relay_delay(mut self, relay_delay: Duration) -> Self {
        self.relay_delay = relay_delay;
        self
    }

    /// Runs one round for a conversation.
    ///
    /// Any pending follow-up for the context is cleared first. One-time
    /// rounds may open a new one based on what the chatbot asked.
    pub async fn run_round<O: Outbound>(
        &self,
        registry: &SessionRegistry,
        outbound: &O,
        conversation: &Conversation,
        input: &ChatMessage,
        one_time: bool,
    ) -> Result<RoundOutcome> {
        registry.clear(&conversation.id).await;

        let replies = if input.is_empty() {
            debug!("Empty input from {}, skipping chatbot", conversation.id);
            Vec::new()
        } else {
            self.client
                .call(
                    Some(&input.text),
                    &input.image_urls,
                    &conversation.user_id,
                    conversation.group_id.as_deref(),
                )
                .await
        };

        if replies.is_empty() {
            outbound.send(render(I_DONT_UNDERSTAND)).await?;
        } else {
            for (index, reply) in replies.iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(self.relay_delay).await;
                }
                outbound.send(reply).await?;
            }
            info!(
                "Relayed {} chatbot replies to {}",
                replies.len(),
                conversation.id
            );
        }

        let expected = if one_time {
            infer_entity_type(&replies, &self.keywords)
        } else {
            None
        };
        if let Some(expected) = expected {
            registry.set(&conversation.id, expected).await;
        }

        Ok(RoundOutcome { replies, expected })
    }
}
