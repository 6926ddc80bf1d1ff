//! Decides whether a plain message should go to the chat fallback.

use log::{debug, warn};

use crate::lexer::{Lexer, Word};
use crate::registry::SessionRegistry;
use crate::types::{ChatMessage, ContextId};

/// Name of the command the fallback routes to.
pub const FALLBACK_COMMAND: &str = "chat";

/// Baseline confidence for a message addressed to the bot.
const DIRECT_ADDRESS_CONFIDENCE: f64 = 60.0;
/// Confidence of a one-word follow-up before the per-word penalty.
const FOLLOW_UP_BASE_CONFIDENCE: f64 = 100.0;
const FOLLOW_UP_WORD_PENALTY: f64 = 5.0;

/// A message as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub context: ContextId,
    pub message: ChatMessage,
    /// Mentioned the bot, used a nickname, or was sent privately.
    pub to_me: bool,
}

/// Arguments handed to the fallback command.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackArgs {
    pub message: ChatMessage,
    pub one_time: bool,
}

/// A routing suggestion. The host decides whether the confidence is enough.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub confidence: f64,
    pub command: &'static str,
    pub args: FallbackArgs,
}

/// Confidence for a follow-up of `word_count` words, clamped to `[0, 100]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn follow_up_confidence(word_count: usize) -> f64 {
    (FOLLOW_UP_BASE_CONFIDENCE - FOLLOW_UP_WORD_PENALTY * word_count as f64).clamp(0.0, 100.0)
}

pub struct IntentDispatcher<'a, L: Lexer> {
    registry: &'a SessionRegistry,
    lexer: Option<&'a L>,
}

impl<'a, L: Lexer> IntentDispatcher<'a, L> {
    pub fn new(registry: &'a SessionRegistry, lexer: Option<&'a L>) -> Self {
        Self { registry, lexer }
    }

    /// Scores a message. `None` means no opinion, which is distinct from a
    /// computed score of zero.
    pub async fn evaluate(&self, incoming: &IncomingMessage) -> Option<Intent> {
        let mut confidence = incoming.to_me.then_some(DIRECT_ADDRESS_CONFIDENCE);

        if let Some(expected) = self.registry.get(&incoming.context).await {
            let words = self.first_paragraph(&incoming.message.text).await;
            if words.iter().any(|word| word.entity == Some(expected)) {
                let score = follow_up_confidence(words.len());
                debug!(
                    "Message from {} follows up a {expected} session ({} words, confidence {score})",
                    incoming.context,
                    words.len()
                );
                confidence = Some(score);
            }
        }

        confidence.map(|confidence| Intent {
            confidence,
            command: FALLBACK_COMMAND,
            args: FallbackArgs {
                message: incoming.message.clone(),
                one_time: true,
            },
        })
    }

    async fn first_paragraph(&self, text: &str) -> Vec<Word> {
        let Some(lexer) = self.lexer else {
            return Vec::new();
        };

        match lexer.lex(text).await {
            Ok(paragraphs) => paragraphs.into_iter().next().unwrap_or_default(),
            Err(e) => {
                warn!("Failed to lex message: {e}");
                Vec::new()
            }
        }
    }
}
