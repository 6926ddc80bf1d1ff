//! Multi-turn chat prompts.
//!
//! An explicit `chat` invocation keeps listening to the same user in the same
//! channel. Each prompt is a small state machine; the event handler resumes it
//! whenever a message arrives for its context.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use poise::serenity_prelude::ChannelId;
use tokio::sync::RwLock;

use crate::types::ContextId;

const FAREWELL_WORDS: &[&str] = &["拜拜", "再见", "退出", "bye"];
const CANCEL_WORDS: &[&str] = &["算了", "不用了", "取消"];
/// Longer messages are treated as chat even if they contain a farewell word.
const MAX_FAREWELL_CHARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// Opened without input, waiting for the first message.
    AwaitingInput,
    /// A round is running.
    Processing,
    /// A round finished, waiting for the next message.
    AwaitingContinuation,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptEvent {
    InputReceived,
    RoundCompleted,
    Farewell,
    Cancelled,
    Expired,
}

impl PromptState {
    #[must_use]
    pub fn next(self, event: PromptEvent) -> Self {
        use PromptEvent::{Cancelled, Expired, Farewell, InputReceived, RoundCompleted};
        use PromptState::{AwaitingContinuation, AwaitingInput, Processing, Terminated};

        match (self, event) {
            (Terminated, _) | (_, Farewell | Cancelled | Expired) => Terminated,
            (AwaitingInput | AwaitingContinuation, InputReceived) => Processing,
            (Processing, RoundCompleted) => AwaitingContinuation,
            (state, event) => {
                debug!("Ignoring prompt event {event:?} in state {state:?}");
                state
            }
        }
    }

    #[must_use]
    pub fn is_waiting(self) -> bool {
        matches!(
            self,
            PromptState::AwaitingInput | PromptState::AwaitingContinuation
        )
    }
}

/// How a message sent into an open prompt is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    Farewell,
    Cancel,
    Chat,
}

#[must_use]
pub fn classify_reply(text: &str) -> PromptReply {
    let text = text.trim();
    if text.chars().count() > MAX_FAREWELL_CHARS {
        return PromptReply::Chat;
    }

    let lower = text.to_lowercase();
    if FAREWELL_WORDS.iter().any(|word| lower.contains(word)) {
        PromptReply::Farewell
    } else if CANCEL_WORDS.iter().any(|word| lower.contains(word)) {
        PromptReply::Cancel
    } else {
        PromptReply::Chat
    }
}

#[derive(Debug, Clone, Copy)]
struct Prompt {
    channel_id: ChannelId,
    state: PromptState,
    last_active: Instant,
}

/// Open prompts by context.
#[derive(Debug)]
pub struct PromptSessions {
    prompts: RwLock<HashMap<ContextId, Prompt>>,
    timeout: Duration,
}

impl PromptSessions {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            prompts: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Opens a prompt, replacing any previous one for the context.
    pub async fn open(&self, context: &ContextId, channel_id: ChannelId, state: PromptState) {
        debug!("Opening chat prompt for {context} in channel {channel_id} ({state:?})");
        self.prompts.write().await.insert(
            context.clone(),
            Prompt {
                channel_id,
                state,
                last_active: Instant::now(),
            },
        );
    }

    /// Returns the state of a prompt waiting for a message from this context
    /// in this channel. Expired prompts are dropped.
    pub async fn waiting_in(&self, context: &ContextId, channel_id: ChannelId) -> Option<PromptState> {
        let prompt = *self.prompts.read().await.get(context)?;

        if prompt.last_active.elapsed() > self.timeout {
            debug!("Chat prompt for {context} expired");
            self.advance(context, PromptEvent::Expired).await;
            return None;
        }

        (prompt.channel_id == channel_id && prompt.state.is_waiting()).then_some(prompt.state)
    }

    /// Applies an event. Terminated prompts are removed.
    pub async fn advance(&self, context: &ContextId, event: PromptEvent) -> Option<PromptState> {
        let mut prompts = self.prompts.write().await;
        let prompt = prompts.get_mut(context)?;
        prompt.state = prompt.state.next(event);
        prompt.last_active = Instant::now();
        let state = prompt.state;

        if state == PromptState::Terminated {
            debug!("Chat prompt for {context} terminated ({event:?})");
            prompts.remove(context);
        }
        Some(state)
    }
}
