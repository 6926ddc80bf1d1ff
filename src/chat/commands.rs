//! The `chat` command.

use crate::bot::Data;
use crate::error::{BotError, Result};
use crate::types::{ChatMessage, Conversation};

use super::expressions::{READY_TO_CHAT, render};
use super::handler::{escape_for_discord, image_urls};
use super::prompt::{PromptEvent, PromptState};
use super::round::Outbound;

/// Context type for chat commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

/// Replies through the invoking command.
struct CommandOutbound<'a>(Context<'a>);

impl Outbound for CommandOutbound<'_> {
    async fn send(&self, text: &str) -> Result<()> {
        self.0.say(escape_for_discord(text)).await?;
        Ok(())
    }
}

fn invocation_images(ctx: Context<'_>) -> Vec<String> {
    match ctx {
        poise::Context::Prefix(prefix) => image_urls(&prefix.msg.attachments),
        poise::Context::Application(_) => Vec::new(),
    }
}

/// Chat with naicha. Without a message, naicha keeps listening until you say goodbye.
#[poise::command(prefix_command, slash_command, aliases("聊天", "对话"))]
pub async fn chat(
    ctx: Context<'_>,
    #[description = "What to say"]
    #[rest]
    message: Option<String>,
) -> Result<()> {
    let data = ctx.data();
    let conversation = Conversation::new(ctx.author().id, ctx.guild_id());
    let _guard = data.registry().lock_context(&conversation.id).await;

    let input = ChatMessage {
        text: message.unwrap_or_default().trim().to_string(),
        image_urls: invocation_images(ctx),
    };
    let outbound = CommandOutbound(ctx);

    if input.is_empty() {
        data.prompts()
            .open(&conversation.id, ctx.channel_id(), PromptState::AwaitingInput)
            .await;
        return outbound.send(render(READY_TO_CHAT)).await;
    }

    ctx.defer().await?;
    data.prompts()
        .open(&conversation.id, ctx.channel_id(), PromptState::Processing)
        .await;

    let result = data
        .chatbot()
        .run_round(data.registry(), &outbound, &conversation, &input, false)
        .await;
    data.prompts()
        .advance(&conversation.id, PromptEvent::RoundCompleted)
        .await;

    result.map(|_| ())
}

/// Get available chat commands.
#[must_use]
pub fn chat_commands() -> Vec<poise::Command<Data, BotError>> {
    vec![chat()]
}
