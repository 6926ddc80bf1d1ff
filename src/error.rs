use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lexer error: {0}")]
    Lexer(String),
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Returns a user-friendly error message suitable for displaying in Discord
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            BotError::Serenity(_) => {
                "抱歉，奶茶现在和 Discord 的连接不太顺畅，请稍后再试~".to_string()
            }
            BotError::Config(_) | BotError::EnvVar(_) | BotError::Pattern(_) => {
                "抱歉，奶茶的配置出了点问题，请联系管理员~".to_string()
            }
            BotError::Reqwest(_) | BotError::Json(_) | BotError::Lexer(_) => {
                "抱歉，奶茶的网络好像出了点问题，请稍后再试~".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
