//! Discord bot core logic and event handling.

use log::{debug, error, info, warn};
use poise::{
    Framework, FrameworkError, FrameworkOptions, PrefixFrameworkOptions, builtins,
    serenity_prelude::{ClientBuilder, Context, FullEvent, GatewayIntents},
};

use crate::chat::{Chatbot, PromptSessions, chat_commands, handle_message};
use crate::config::Config;
use crate::entity::KeywordTable;
use crate::error::{BotError, Result};
use crate::lexer::LtpLexer;
use crate::registry::SessionRegistry;
use crate::tuling::TulingClient;

/// State shared by every command and event.
pub struct Data {
    chatbot: Chatbot,
    registry: SessionRegistry,
    prompts: PromptSessions,
    lexer: Option<LtpLexer>,
    nicknames: Vec<String>,
    command_prefix: String,
}

impl Data {
    #[must_use]
    pub fn new(
        chatbot: Chatbot,
        registry: SessionRegistry,
        prompts: PromptSessions,
        lexer: Option<LtpLexer>,
        nicknames: Vec<String>,
        command_prefix: String,
    ) -> Self {
        Self {
            chatbot,
            registry,
            prompts,
            lexer,
            nicknames,
            command_prefix,
        }
    }

    fn from_config(config: &Config) -> Result<Self> {
        let client = match &config.tuling_api_url {
            Some(url) => TulingClient::with_api_url(config.tuling_api_keys.clone(), url.clone()),
            None => TulingClient::new(config.tuling_api_keys.clone()),
        };

        let lexer = config.ltp_cloud_api_key.clone().map(LtpLexer::new);
        if lexer.is_none() {
            warn!("LTP_CLOUD_API_KEY not set, follow-up detection is disabled");
        }

        Ok(Self::new(
            Chatbot::new(client, KeywordTable::default_table()?),
            SessionRegistry::new(config.pending_session_ttl),
            PromptSessions::new(config.prompt_timeout),
            lexer,
            config.nicknames.clone(),
            config.command_prefix.clone(),
        ))
    }

    #[must_use]
    pub fn chatbot(&self) -> &Chatbot {
        &self.chatbot
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn prompts(&self) -> &PromptSessions {
        &self.prompts
    }

    #[must_use]
    pub fn lexer(&self) -> Option<&LtpLexer> {
        self.lexer.as_ref()
    }

    #[must_use]
    pub fn nicknames(&self) -> &[String] {
        &self.nicknames
    }
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing chatbot state");
    let data = Data::from_config(&config)?;

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: chat_commands(),
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                mention_as_prefix: false,
                ..Default::default()
            },
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready and connected to Discord");
                debug!("Registering commands globally");
                builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully");
                Ok(data)
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> Result<()> {
    let FullEvent::Message { new_message } = event else {
        return Ok(());
    };

    let bot_user_id = ctx.cache.current_user().id;
    if new_message.author.bot || new_message.author.id == bot_user_id {
        return Ok(());
    }
    // Prefix commands are dispatched by poise itself.
    if new_message
        .content
        .trim_start()
        .starts_with(data.command_prefix.as_str())
    {
        return Ok(());
    }

    if let Err(e) = handle_message(ctx, new_message, data, bot_user_id).await {
        error!(
            "Error processing message from {}: {}",
            new_message.author.tag(),
            e
        );
        new_message.reply(&ctx.http, e.user_message()).await?;
    }

    Ok(())
}

async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!("Command '{}' failed: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(error.user_message()).await {
                warn!("Failed to report command error: {e}");
            }
        }
        other => {
            if let Err(e) = builtins::on_error(other).await {
                error!("Failed to handle framework error: {e}");
            }
        }
    }
}
