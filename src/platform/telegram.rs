use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::TransportError;
use crate::handler::QueryHandler;
use crate::platform::{IncomingRequest, Messenger, OutgoingReply, ReplyFormat};

/// Sends replies through the Telegram Bot API.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, reply: &OutgoingReply) -> Result<(), TransportError> {
        let request = self.bot.send_message(ChatId(reply.chat_id), &reply.text);
        let request = match reply.format {
            ReplyFormat::Plain => request,
            ReplyFormat::Html => request.parse_mode(ParseMode::Html),
        };

        request.await.map(|_| ()).map_err(|e| TransportError {
            chat_id: reply.chat_id,
            message: e.to_string(),
        })
    }
}

/// Run the Telegram bot until the dispatcher stops
pub async fn run(config: Arc<Config>, handler: Arc<QueryHandler>) -> Result<()> {
    let bot = Bot::new(&config.telegram.bot_token);

    info!("Starting Telegram platform...");
    if config.telegram.allowed_user_ids.is_empty() {
        info!("  Allowed users: everyone");
    } else {
        info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);
    }

    let dispatch = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if config.is_user_allowed(user.id.0) {
                Some(msg)
            } else {
                warn!("Ignoring message from user {} (not allowed)", user.id.0);
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, dispatch)
        .dependencies(dptree::deps![handler])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    handler: Arc<QueryHandler>,
) -> ResponseResult<()> {
    // Stickers, photos and the like carry no query
    let Some(text) = msg.text() else {
        return Ok(());
    };

    info!("Telegram message in chat {}: {}", msg.chat.id.0, text);

    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
        .ok();

    let request = IncomingRequest {
        chat_id: msg.chat.id.0,
        text: text.to_string(),
    };

    let messenger = TelegramMessenger::new(bot);
    if let Err(e) = handler.handle_and_send(&request, &messenger).await {
        error!("Failed to reply in chat {}: {}", request.chat_id, e);
    }

    Ok(())
}
