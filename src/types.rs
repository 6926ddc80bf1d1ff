//! Common types used throughout the naicha bot.

use std::fmt;

use mime::Mime;
use poise::serenity_prelude::{GuildId, UserId};
use strum::{AsRefStr, Display, EnumString};

/// Coarse named-entity category.
///
/// Used both for lexer word tags and for the kind of follow-up the chatbot
/// API is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Places, cities, addresses
    Location,
    /// Dates and times
    Time,
    /// Person names
    Person,
    /// Organization names
    Organization,
}

/// Opaque identifier of one logical conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    /// Context of a user, scoped to a server when there is one.
    #[must_use]
    pub fn for_user(user_id: UserId, guild_id: Option<GuildId>) -> Self {
        match guild_id {
            Some(guild_id) => Self(format!("/guild/{guild_id}/user/{user_id}")),
            None => Self(format!("/user/{user_id}")),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is talking, as seen by the chatbot API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ContextId,
    pub user_id: String,
    pub group_id: Option<String>,
}

impl Conversation {
    #[must_use]
    pub fn new(user_id: UserId, guild_id: Option<GuildId>) -> Self {
        Self {
            id: ContextId::for_user(user_id, guild_id),
            user_id: user_id.to_string(),
            group_id: guild_id.map(|id| id.to_string()),
        }
    }
}

/// The user input of one chat round: plain text plus attached image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub image_urls: Vec<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_urls: Vec::new(),
        }
    }

    /// True when there is neither text nor an image to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image_urls.is_empty()
    }
}

/// Check whether a MIME content type string describes an image.
#[must_use]
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .is_ok_and(|mime| mime.type_() == mime::IMAGE)
}
