use crate::fsm::{State, TrainerDialogue};
use crate::keyboards::{self, Reply};
use crate::router::{self, Incoming, Services};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, instrument};

const TEXT_ONLY: &str = "Пожалуйста, отправь текстовое сообщение или нажми кнопку.";

/// Reads the user's state, routes the text and persists the next state.
#[instrument(skip_all)]
pub async fn handle_update(
    bot: Bot,
    dialogue: TrainerDialogue,
    msg: Message,
    app: Arc<Services>,
) -> Result<()> {
    let user = match msg.from() {
        Some(u) => u,
        None => return Ok(()),
    };

    let Some(text) = msg.text() else {
        debug!(chat = msg.chat.id.0, "ignoring non-text message");
        send(&bot, msg.chat.id, &Reply::plain(TEXT_ONLY)).await?;
        return Ok(());
    };

    let state: State = dialogue.get_or_default().await?;
    let incoming = Incoming {
        telegram_id: user.id.0 as i64,
        username: user.username.as_deref(),
        text,
    };
    let outcome = router::route(&app, state, incoming).await?;

    dialogue.update(outcome.state).await?;
    for reply in &outcome.replies {
        send(&bot, msg.chat.id, reply).await?;
    }
    Ok(())
}

async fn send(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<()> {
    let request = bot.send_message(chat_id, reply.text.clone());
    match keyboards::to_telegram(&reply.markup) {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };
    Ok(())
}
