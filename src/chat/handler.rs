//! Routing of plain Discord messages to the chatbot.

use log::{debug, info};
use poise::serenity_prelude::{
    Attachment, ChannelId, Context, Message as SerenityMessage, MessageBuilder, UserId,
};


use crate::bot::Data;
use crate::dispatcher::{IncomingMessage, IntentDispatcher};
use crate::error::Result;
use crate::types::{ChatMessage, Conversation, is_image_content_type};

use super::expressions::{CANCELLED, FAREWELL, render};
use super::prompt::{PromptEvent, PromptReply, classify_reply};
use super::round::Outbound;

/// Minimum confidence for the fallback to take a message.
const DISPATCH_THRESHOLD: f64 = 60.0;

/// Sends plain messages to a channel.
pub struct ChannelOutbound<'a> {
    pub ctx: &'a Context,
    pub channel_id: ChannelId,
}

impl Outbound for ChannelOutbound<'_> {
    async fn send(&self, text: &str) -> Result<()> {
        self.channel_id
            .say(&self.ctx.http, escape_for_discord(text))
            .await?;
        Ok(())
    }

    async fn typing(&self) {
        if let Err(e) = self.channel_id.broadcast_typing(&self.ctx.http).await {
            debug!("Failed to broadcast typing indicator: {e}");
        }
    }
}

/// Escapes Discord markdown and mentions. Bare links are left intact.
#[must_use]
pub fn escape_for_discord(text: &str) -> String {
    let is_link = (text.starts_with("http://") || text.starts_with("https://"))
        && !text.chars().any(char::is_whitespace);
    if is_link {
        text.to_string()
    } else {
        MessageBuilder::new().push_safe(text).build()
    }
}

/// URLs of the image attachments, in order.
#[must_use]
pub fn image_urls(attachments: &[Attachment]) -> Vec<String> {
    attachments
        .iter()
        .filter(|attachment| {
            attachment
                .content_type
                .as_deref()
                .is_some_and(is_image_content_type)
        })
        .map(|attachment| attachment.url.clone())
        .collect()
}

/// Removes the bot's mentions and a leading nickname.
///
/// Returns the remaining text and whether the bot was addressed.
#[must_use]
pub fn strip_address(content: &str, bot_user_id: UserId, nicknames: &[String]) -> (String, bool) {
    let mut text = content.to_string();
    let mut addressed = false;

    for mention in [format!("<@{bot_user_id}>"), format!("<@!{bot_user_id}>")] {
        if text.contains(&mention) {
            addressed = true;
            text = text.replace(&mention, "");
        }
    }

    let trimmed = text.trim_start();
    let nickname = nicknames
        .iter()
        .filter(|nickname| !nickname.is_empty() && trimmed.starts_with(nickname.as_str()))
        .max_by_key(|nickname| nickname.len());
    if let Some(nickname) = nickname {
        addressed = true;
        text = trimmed[nickname.len()..]
            .trim_start_matches(|c: char| c.is_whitespace() || ",，:：!！~".contains(c))
            .to_string();
    }

    (text.trim().to_string(), addressed)
}

/// Handles a plain message from Discord.
pub async fn handle_message(
    ctx: &Context,
    new_message: &SerenityMessage,
    data: &Data,
    bot_user_id: UserId,
) -> Result<()> {
    let conversation = Conversation::new(new_message.author.id, new_message.guild_id);
    let _guard = data.registry().lock_context(&conversation.id).await;

    let (text, addressed) = strip_address(&new_message.content, bot_user_id, data.nicknames());
    let message = ChatMessage {
        text,
        image_urls: image_urls(&new_message.attachments),
    };
    let outbound = ChannelOutbound {
        ctx,
        channel_id: new_message.channel_id,
    };

    route_message(
        data,
        &outbound,
        &conversation,
        new_message.channel_id,
        message,
        addressed || new_message.guild_id.is_none(),
    )
    .await
}

/// Resumes an open prompt, or asks the dispatcher whether the fallback
/// should answer. The caller holds the context lock.
async fn route_message<O: Outbound>(
    data: &Data,
    outbound: &O,
    conversation: &Conversation,
    channel_id: ChannelId,
    message: ChatMessage,
    to_me: bool,
) -> Result<()> {
    if data
        .prompts()
        .waiting_in(&conversation.id, channel_id)
        .await
        .is_some()
    {
        return continue_prompt(data, outbound, conversation, &message).await;
    }

    let dispatcher = IntentDispatcher::new(data.registry(), data.lexer());
    let incoming = IncomingMessage {
        context: conversation.id.clone(),
        message,
        to_me,
    };
    let Some(intent) = dispatcher.evaluate(&incoming).await else {
        return Ok(());
    };

    debug!(
        "Dispatcher suggests '{}' for {} with confidence {}",
        intent.command, conversation.id, intent.confidence
    );
    if intent.confidence < DISPATCH_THRESHOLD {
        return Ok(());
    }

    info!(
        "Chat fallback for {} in channel {channel_id}: {}",
        conversation.id, intent.args.message.text
    );
    outbound.typing().await;

    data.chatbot()
        .run_round(
            data.registry(),
            outbound,
            conversation,
            &intent.args.message,
            intent.args.one_time,
        )
        .await?;
    Ok(())
}

/// Feeds a message into the conversation's open prompt.
async fn continue_prompt<O: Outbound>(
    data: &Data,
    outbound: &O,
    conversation: &Conversation,
    message: &ChatMessage,
) -> Result<()> {
    let prompts = data.prompts();

    match classify_reply(&message.text) {
        PromptReply::Farewell => {
            prompts.advance(&conversation.id, PromptEvent::Farewell).await;
            outbound.send(render(FAREWELL)).await
        }
        PromptReply::Cancel => {
            prompts.advance(&conversation.id, PromptEvent::Cancelled).await;
            outbound.send(render(CANCELLED)).await
        }
        PromptReply::Chat => {
            prompts
                .advance(&conversation.id, PromptEvent::InputReceived)
                .await;
            let result = data
                .chatbot()
                .run_round(data.registry(), outbound, conversation, message, false)
                .await;
            prompts
                .advance(&conversation.id, PromptEvent::RoundCompleted)
                .await;
            result.map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use poise::serenity_prelude::GuildId;

    use super::*;
    use crate::chat::prompt::{PromptSessions, PromptState};
    use crate::chat::testing::{RecordingOutbound, chatbot, tuling_replying};
    use crate::lexer::LtpLexer;
    use crate::registry::SessionRegistry;
    use crate::types::EntityType;

    fn channel() -> ChannelId {
        ChannelId::new(10)
    }

    fn data(server: &MockServer) -> Data {
        Data::new(
            chatbot(server),
            SessionRegistry::default(),
            PromptSessions::new(Duration::from_secs(60)),
            None::<LtpLexer>,
            nicknames(),
            "/".to_string(),
        )
    }

    fn conversation() -> Conversation {
        Conversation::new(UserId::new(42), Some(GuildId::new(7)))
    }

    fn nicknames() -> Vec<String> {
        vec!["奶茶".to_string(), "小奶茶".to_string()]
    }

    #[test]
    fn mention_is_stripped_and_addresses_bot() {
        let (text, addressed) = strip_address("<@42> 你好", UserId::new(42), &nicknames());
        assert_eq!(text, "你好");
        assert!(addressed);

        let (text, addressed) = strip_address("你好 <@!42>", UserId::new(42), &nicknames());
        assert_eq!(text, "你好");
        assert!(addressed);
    }

    #[test]
    fn other_mentions_are_kept() {
        let (text, addressed) = strip_address("<@7> 你好", UserId::new(42), &nicknames());
        assert_eq!(text, "<@7> 你好");
        assert!(!addressed);
    }

    #[test]
    fn leading_nickname_addresses_bot() {
        let (text, addressed) = strip_address("小奶茶，在吗", UserId::new(42), &nicknames());
        assert_eq!(text, "在吗");
        assert!(addressed);

        let (text, addressed) = strip_address("奶茶 讲个笑话", UserId::new(42), &nicknames());
        assert_eq!(text, "讲个笑话");
        assert!(addressed);
    }

    #[test]
    fn nickname_in_the_middle_does_not_address() {
        let (text, addressed) = strip_address("我想喝奶茶", UserId::new(42), &nicknames());
        assert_eq!(text, "我想喝奶茶");
        assert!(!addressed);
    }

    #[test]
    fn links_are_not_escaped() {
        assert_eq!(
            escape_for_discord("https://example.com/a_b_c"),
            "https://example.com/a_b_c"
        );
    }

    #[test]
    fn markdown_is_escaped() {
        let escaped = escape_for_discord("*重要*");
        assert_ne!(escaped, "*重要*");
        assert!(escaped.contains("重要"));
    }

    #[tokio::test]
    async fn addressed_greeting_is_answered_without_a_session() {
        let server = tuling_replying(&["你好呀！"]).await;
        let data = data(&server);
        let outbound = RecordingOutbound::default();
        let conversation = conversation();

        route_message(
            &data,
            &outbound,
            &conversation,
            channel(),
            ChatMessage::text("你好"),
            true,
        )
        .await
        .expect("routing succeeds");

        assert_eq!(outbound.sent(), vec!["你好呀！".to_string()]);
        assert_eq!(data.registry().get(&conversation.id).await, None);
    }

    #[tokio::test]
    async fn addressed_question_opens_a_session() {
        let server = tuling_replying(&["你在哪个城市？"]).await;
        let data = data(&server);
        let conversation = conversation();

        route_message(
            &data,
            &RecordingOutbound::default(),
            &conversation,
            channel(),
            ChatMessage::text("明天天气怎么样"),
            true,
        )
        .await
        .expect("routing succeeds");

        assert_eq!(
            data.registry().get(&conversation.id).await,
            Some(EntityType::Location)
        );
    }

    #[tokio::test]
    async fn unaddressed_message_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let data = data(&server);
        let outbound = RecordingOutbound::default();

        route_message(
            &data,
            &outbound,
            &conversation(),
            channel(),
            ChatMessage::text("你好"),
            false,
        )
        .await
        .expect("routing succeeds");

        assert!(outbound.sent().is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn farewell_ends_the_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let data = data(&server);
        let outbound = RecordingOutbound::default();
        let conversation = conversation();
        data.prompts()
            .open(&conversation.id, channel(), PromptState::AwaitingContinuation)
            .await;

        route_message(
            &data,
            &outbound,
            &conversation,
            channel(),
            ChatMessage::text("拜拜"),
            false,
        )
        .await
        .expect("routing succeeds");

        let sent = outbound.sent();
        assert_eq!(sent.len(), 1);
        assert!(FAREWELL.contains(&sent[0].as_str()));
        assert_eq!(
            data.prompts().waiting_in(&conversation.id, channel()).await,
            None
        );
        server.verify().await;
    }

    #[tokio::test]
    async fn cancel_ends_the_prompt() {
        let server = MockServer::start().await;
        let data = data(&server);
        let outbound = RecordingOutbound::default();
        let conversation = conversation();
        data.prompts()
            .open(&conversation.id, channel(), PromptState::AwaitingInput)
            .await;

        route_message(
            &data,
            &outbound,
            &conversation,
            channel(),
            ChatMessage::text("算了"),
            false,
        )
        .await
        .expect("routing succeeds");

        let sent = outbound.sent();
        assert_eq!(sent.len(), 1);
        assert!(CANCELLED.contains(&sent[0].as_str()));
        assert_eq!(
            data.prompts().waiting_in(&conversation.id, channel()).await,
            None
        );
    }

    #[tokio::test]
    async fn prompt_reply_runs_an_explicit_round() {
        let server = tuling_replying(&["你在哪个城市？"]).await;
        let data = data(&server);
        let outbound = RecordingOutbound::default();
        let conversation = conversation();
        data.prompts()
            .open(&conversation.id, channel(), PromptState::AwaitingInput)
            .await;

        route_message(
            &data,
            &outbound,
            &conversation,
            channel(),
            ChatMessage::text("明天天气怎么样"),
            false,
        )
        .await
        .expect("routing succeeds");

        assert_eq!(outbound.sent(), vec!["你在哪个城市？".to_string()]);
        assert_eq!(data.registry().get(&conversation.id).await, None);
        assert_eq!(
            data.prompts().waiting_in(&conversation.id, channel()).await,
            Some(PromptState::AwaitingContinuation)
        );
    }

    #[tokio::test]
    async fn waiting_prompt_takes_priority_over_the_dispatcher() {
        let server = tuling_replying(&["你在哪个城市？"]).await;
        let data = data(&server);
        let conversation = conversation();
        data.prompts()
            .open(&conversation.id, channel(), PromptState::AwaitingContinuation)
            .await;

        // Addressed, so the dispatcher alone would run a one-time round and
        // open a location session.
        route_message(
            &data,
            &RecordingOutbound::default(),
            &conversation,
            channel(),
            ChatMessage::text("明天天气怎么样"),
            true,
        )
        .await
        .expect("routing succeeds");

        assert_eq!(data.registry().get(&conversation.id).await, None);
        assert_eq!(
            data.prompts().waiting_in(&conversation.id, channel()).await,
            Some(PromptState::AwaitingContinuation)
        );
    }

    #[tokio::test]
    async fn prompt_in_another_channel_is_left_alone() {
        let server = tuling_replying(&["你在哪个城市？"]).await;
        let data = data(&server);
        let conversation = conversation();
        data.prompts()
            .open(&conversation.id, ChannelId::new(11), PromptState::AwaitingInput)
            .await;

        route_message(
            &data,
            &RecordingOutbound::default(),
            &conversation,
            channel(),
            ChatMessage::text("明天天气怎么样"),
            true,
        )
        .await
        .expect("routing succeeds");

        assert_eq!(
            data.registry().get(&conversation.id).await,
            Some(EntityType::Location)
        );
        assert_eq!(
            data.prompts()
                .waiting_in(&conversation.id, ChannelId::new(11))
                .await,
            Some(PromptState::AwaitingInput)
        );
    }
}
