//! Bot initialization and message routing utilities
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Message addressing logic (private chats, mentions, replies)

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{ChatKind, Message, MessageEntityKind, UserId};
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Я умею:")]
pub enum Command {
    #[command(description = "приветствие")]
    Start,
    #[command(description = "зарегистрировать квартиру и номер телефона")]
    Home,
    #[command(description = "узнать, кто живет в квартире")]
    WhoLives,
    #[command(description = "список всех зарегистрированных жильцов")]
    ListResidents,
}

/// Creates a Bot instance from the environment token
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Token missing or HTTP client creation failed
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) environment variable is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(token, client))
}

/// Sets up bot commands in Telegram UI
///
/// # Arguments
/// * `bot` - Bot instance to configure
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "приветствие"),
        BotCommand::new("home", "зарегистрировать квартиру и номер телефона"),
        BotCommand::new("who_lives", "узнать, кто живет в квартире"),
        BotCommand::new("list_residents", "список всех зарегистрированных жильцов"),
    ])
    .await?;

    Ok(())
}

/// Checks if a message is addressed to the bot
///
/// # Arguments
/// * `msg` - Message to check
/// * `bot_username` - Bot's username (without @)
/// * `bot_id` - Bot's user ID
///
/// # Returns
/// * `true` if message is addressed to bot (private chat, bot mention, reply to bot message)
/// * `false` if message is not addressed to bot
pub fn is_message_addressed_to_bot(msg: &Message, bot_username: Option<&str>, bot_id: UserId) -> bool {
    // In private chats, all messages are addressed to the bot
    if matches!(msg.chat.kind, ChatKind::Private(_)) {
        return true;
    }

    // Check if the message is a reply to a bot message
    if let Some(reply_to) = msg.reply_to_message() {
        if let Some(from) = &reply_to.from {
            if from.id == bot_id {
                return true;
            }
        }
    }

    // Check message entities for a mention of the bot
    if let (Some(text), Some(entities)) = (msg.text(), msg.entities()) {
        for entity in entities {
            if matches!(entity.kind, MessageEntityKind::Mention) {
                let Some(mention) = entity_slice(text, entity.offset, entity.length) else {
                    continue;
                };
                let mention_username = mention.strip_prefix('@').unwrap_or(mention);
                if let Some(username) = bot_username {
                    if mention_username.eq_ignore_ascii_case(username) {
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Slices message text by a Telegram entity range.
///
/// Entity `offset`/`length` are UTF-16 code units, not bytes, so they must
/// be remapped before indexing into a Rust `&str` (any non-ASCII text in
/// front of the entity shifts the byte position). Returns `None` when the
/// range does not map onto the text.
fn entity_slice(text: &str, utf16_offset: usize, utf16_length: usize) -> Option<&str> {
    let utf16_end = utf16_offset.checked_add(utf16_length)?;

    let mut utf16_pos = 0;
    let mut byte_start = None;
    let mut byte_end = None;
    for (byte_idx, ch) in text.char_indices() {
        if utf16_pos == utf16_offset {
            byte_start = Some(byte_idx);
        }
        if utf16_pos == utf16_end {
            byte_end = Some(byte_idx);
            break;
        }
        utf16_pos += ch.len_utf16();
    }
    // Ranges ending exactly at the end of the text
    if utf16_pos == utf16_offset {
        byte_start.get_or_insert(text.len());
    }
    if utf16_pos == utf16_end {
        byte_end.get_or_insert(text.len());
    }

    text.get(byte_start?..byte_end?)
}
