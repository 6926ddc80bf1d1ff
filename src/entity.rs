//! Guessing what kind of follow-up the chatbot is asking for.
//!
//! The chatbot API never says it is waiting for, say, a city. Its replies
//! just ask "你在哪个城市？". Scanning them for a few keywords is enough to
//! tell which kind of answer should count as a follow-up.

use log::debug;
use regex::Regex;

use crate::error::Result;
use crate::types::EntityType;

/// A keyword test applied to a reply.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Hits when the literal is a substring of the reply.
    Literal(String),
    /// Hits when the pattern matches anywhere in the reply.
    Pattern(Regex),
}

impl Matcher {
    pub fn literal(text: impl Into<String>) -> Self {
        Matcher::Literal(text.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    #[must_use]
    pub fn hits(&self, reply: &str) -> bool {
        match self {
            Matcher::Literal(text) => reply.contains(text.as_str()),
            Matcher::Pattern(regex) => regex.is_match(reply),
        }
    }
}

/// Ordered mapping from entity type to the matchers that indicate it.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: Vec<(EntityType, Vec<Matcher>)>,
}

impl KeywordTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Earlier entries win over later ones.
    #[must_use]
    pub fn with(mut self, entity: EntityType, matchers: Vec<Matcher>) -> Self {
        self.entries.push((entity, matchers));
        self
    }

    /// The table used for one-time chat rounds.
    pub fn default_table() -> Result<Self> {
        Ok(Self::new()
            .with(
                EntityType::Location,
                vec![
                    Matcher::literal("哪里"),
                    Matcher::literal("哪儿"),
                    Matcher::pattern("哪.城市")?,
                    Matcher::literal("位置"),
                ],
            )
            .with(EntityType::Time, vec![Matcher::literal("什么时候")]))
    }
}

/// Returns the first entity type, in table order, that any matcher finds in any reply.
#[must_use]
pub fn infer_entity_type<S: AsRef<str>>(replies: &[S], table: &KeywordTable) -> Option<EntityType> {
    for (entity, matchers) in &table.entries {
        for reply in replies {
            let reply = reply.as_ref();
            if matchers.iter().any(|matcher| matcher.hits(reply)) {
                debug!("Reply '{reply}' looks like it expects {entity}");
                return Some(*entity);
            }
        }
    }
    None
}
