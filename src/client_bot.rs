//! Linkage with the trainer's own client-facing bot.
//!
//! The only thing done with the stored token is asking Telegram who the bot is,
//! so a `t.me` link can be shown.

use async_trait::async_trait;
use teloxide::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

/// Tokens shorter than this are rejected before anything is stored.
pub const MIN_TOKEN_LEN: usize = 30;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("bot has no username")]
    NoUsername,
}

#[async_trait]
pub trait BotIdentity: Send + Sync {
    /// Returns the username of the bot owning `token`.
    async fn username(&self, token: &str) -> Result<String, LinkError>;
}

/// Calls `getMe` with the client bot's own token.
#[derive(Debug, Clone, Default)]
pub struct TelegramIdentity;

#[async_trait]
impl BotIdentity for TelegramIdentity {
    async fn username(&self, token: &str) -> Result<String, LinkError> {
        let bot = Bot::new(token);
        let me = bot.get_me().await.map_err(|err| {
            warn!(?err, "client bot identity check failed");
            err
        })?;
        let username = me.user.username.clone().ok_or(LinkError::NoUsername)?;
        info!(%username, "client bot identity resolved");
        Ok(username)
    }
}

/// Shape check only: long enough and contains the `id:secret` colon.
pub fn looks_like_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_LEN && token.contains(':')
}

pub fn deep_link(username: &str) -> String {
    format!("https://t.me/{}", username.trim_start_matches('@'))
}
