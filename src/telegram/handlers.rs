//! Dispatcher schema and handlers for commands and free-text messages
//!
//! The free-text state machine itself lives in [`advance_dialogue`] and is
//! independent of teloxide types; the handlers around it only classify the
//! update, render the reply and resolve display handles.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, UserId};

use crate::core::error::{AppError, AppResult};
use crate::core::validation;
use crate::storage::db::{self, Resident};
use crate::storage::get_connection;
use crate::telegram::bot::{is_message_addressed_to_bot, Command};
use crate::telegram::dialogue::{DialogueRegistry, DialogueState};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

const START_GREETING: &str = "Привет! Для начала введите /home";
const APARTMENT_PROMPT: &str = "Введите номер вашей квартиры:";
const PHONE_PROMPT: &str = "Пожалуйста, введите ваш номер телефона:";
const WHO_LIVES_PROMPT: &str = "Введите номер квартиры, чтобы узнать, кто в ней живет:";
const BAD_APARTMENT_REPLY: &str = "Пожалуйста, введите корректный номер квартиры.";
const BAD_PHONE_REPLY: &str =
    "Пожалуйста, введите корректный номер телефона (от 10 до 15 цифр, может начинаться с +).";
const SAVE_FAILED_REPLY: &str =
    "Произошла ошибка при сохранении номера телефона в базе данных. Пожалуйста, повторите попытку.";
const LOOKUP_FAILED_REPLY: &str =
    "Произошла ошибка при чтении из базы данных. Пожалуйста, повторите попытку.";
const EMPTY_LIST_REPLY: &str = "Нет зарегистрированных жильцов.";
const MISSING_PHONE_PLACEHOLDER: &str = "не указан";

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub dialogues: DialogueRegistry,
    pub bot_username: Option<String>,
    pub bot_id: UserId,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        db_pool: Arc<db::DbPool>,
        dialogues: DialogueRegistry,
        bot_username: Option<String>,
        bot_id: UserId,
    ) -> Self {
        Self {
            db_pool,
            dialogues,
            bot_username,
            bot_id,
        }
    }
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// This function returns a handler tree that can be used with teloxide's Dispatcher.
/// The same schema is used in production and can be used in integration tests.
///
/// # Arguments
/// * `deps` - Handler dependencies (database pool, dialogue registry, bot identity)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler(deps_commands))
        // Free-text handler routed through the dialogue state machine
        .branch(message_handler(deps_messages))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => {
                        bot.send_message(msg.chat.id, START_GREETING).await?;
                    }
                    Command::Home => {
                        handle_home_command(&bot, &msg, &deps).await?;
                    }
                    Command::WhoLives => {
                        handle_who_lives_command(&bot, &msg, &deps).await?;
                    }
                    Command::ListResidents => {
                        handle_list_residents_command(&bot, &msg, &deps).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            // Commands are consumed by the command branch; everything that
            // looks like one but did not parse is not free text either
            let is_free_text = msg.text().map(|t| !t.starts_with('/')).unwrap_or(false);
            is_free_text && is_message_addressed_to_bot(&msg, deps_filter.bot_username.as_deref(), deps_filter.bot_id)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_text_message(&bot, &msg, &deps).await }
        })
}

/// `/home`: prompt for the apartment number and start the registration flow.
///
/// The state is set unconditionally, so a pending flag from an earlier
/// command is replaced.
async fn handle_home_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user_id) = message_user_id(msg) else {
        return Ok(());
    };

    deps.dialogues.set(user_id, DialogueState::AwaitingApartment).await;
    bot.send_message(msg.chat.id, APARTMENT_PROMPT).await?;
    Ok(())
}

/// `/who_lives`: prompt for the apartment number to look up.
async fn handle_who_lives_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user_id) = message_user_id(msg) else {
        return Ok(());
    };

    deps.dialogues.set(user_id, DialogueState::AwaitingLookup).await;
    bot.send_message(msg.chat.id, WHO_LIVES_PROMPT).await?;
    Ok(())
}

/// `/list_residents`: full read-only scan; dialogue state is left untouched.
async fn handle_list_residents_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let residents: AppResult<_> = get_connection(&deps.db_pool)
        .map_err(AppError::from)
        .and_then(|conn| db::get_all_residents(&conn).map_err(AppError::from));
    let residents = match residents {
        Ok(residents) => residents,
        Err(e) => {
            log::error!("Failed to list residents: {}", e);
            bot.send_message(msg.chat.id, LOOKUP_FAILED_REPLY).await?;
            return Ok(());
        }
    };

    let reply = if residents.is_empty() {
        EMPTY_LIST_REPLY.to_string()
    } else {
        let lines = format_resident_lines(bot, msg.chat.id, &residents).await;
        format!("Все зарегистрированные жильцы:\n{}", lines)
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Free text routed through the dialogue state machine.
async fn handle_text_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user_id) = message_user_id(msg) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(reply) = advance_dialogue(&deps.db_pool, &deps.dialogues, user_id, text).await else {
        // No pending flag: free text is silently ignored
        return Ok(());
    };

    let reply_text = match reply {
        DialogueReply::PhonePrompt => PHONE_PROMPT.to_string(),
        DialogueReply::BadApartment => BAD_APARTMENT_REPLY.to_string(),
        DialogueReply::BadPhone => BAD_PHONE_REPLY.to_string(),
        DialogueReply::Saved {
            apartment_number,
            phone_number,
        } => registration_confirmation(apartment_number, &phone_number),
        DialogueReply::SaveFailed => SAVE_FAILED_REPLY.to_string(),
        DialogueReply::LookupFailed => LOOKUP_FAILED_REPLY.to_string(),
        DialogueReply::NobodyRegistered { apartment_number } => nobody_registered(apartment_number),
        DialogueReply::Residents {
            apartment_number,
            residents,
        } => {
            let lines = format_resident_lines(bot, msg.chat.id, &residents).await;
            format!("Живут в квартире {}:\n{}", apartment_number, lines)
        }
    };

    bot.send_message(msg.chat.id, reply_text).await?;
    Ok(())
}

/// Outcome of feeding one free-text message through the state machine.
///
/// The Telegram layer renders this into a reply; the `Residents` variant
/// carries raw records so that display-handle resolution stays out of the
/// state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueReply {
    /// Apartment accepted, ask for the phone next
    PhonePrompt,
    /// Apartment input did not parse; the awaiting state is unchanged
    BadApartment,
    /// Phone input did not match the pattern; the awaiting state is unchanged
    BadPhone,
    /// Registration completed and stored
    Saved { apartment_number: i64, phone_number: String },
    /// Storage failed; the awaiting state is kept so the user can retry
    SaveFailed,
    /// Lookup found residents
    Residents {
        apartment_number: i64,
        residents: Vec<Resident>,
    },
    /// Lookup found nobody at that apartment
    NobodyRegistered { apartment_number: i64 },
    /// Lookup could not read the store
    LookupFailed,
}

/// Applies one free-text message to the user's dialogue state.
///
/// Returns `None` when no input is pending (the text is ignored). State
/// transitions follow the registration/lookup asymmetry deliberately:
/// validation failures keep the registration states so the user can resend,
/// while the lookup state is cleared on every outcome, including a parse
/// failure.
pub async fn advance_dialogue(
    db_pool: &Arc<db::DbPool>,
    dialogues: &DialogueRegistry,
    user_id: i64,
    text: &str,
) -> Option<DialogueReply> {
    match dialogues.get(user_id).await {
        DialogueState::Idle => None,
        DialogueState::AwaitingApartment => Some(match validation::parse_apartment_number(text) {
            Ok(apartment_number) => {
                dialogues
                    .set(user_id, DialogueState::AwaitingPhone { apartment_number })
                    .await;
                DialogueReply::PhonePrompt
            }
            Err(e) => {
                log::debug!("Rejected apartment input from user {}: {}", user_id, e);
                DialogueReply::BadApartment
            }
        }),
        DialogueState::AwaitingPhone { apartment_number } => {
            Some(save_phone(db_pool, dialogues, user_id, apartment_number, text).await)
        }
        DialogueState::AwaitingLookup => {
            let reply = lookup_apartment(db_pool, text);
            // Cleared on success AND on parse failure, unlike the
            // registration path
            dialogues.set(user_id, DialogueState::Idle).await;
            Some(reply)
        }
    }
}

async fn save_phone(
    db_pool: &Arc<db::DbPool>,
    dialogues: &DialogueRegistry,
    user_id: i64,
    apartment_number: i64,
    text: &str,
) -> DialogueReply {
    if let Err(e) = validation::validate_phone_number(text) {
        log::debug!("Rejected phone input from user {}: {}", user_id, e);
        return DialogueReply::BadPhone;
    }

    let write_result: AppResult<()> = get_connection(db_pool)
        .map_err(AppError::from)
        .and_then(|conn| db::upsert_resident(&conn, user_id, apartment_number, text).map_err(AppError::from));

    match write_result {
        Ok(()) => {
            dialogues.set(user_id, DialogueState::Idle).await;
            DialogueReply::Saved {
                apartment_number,
                phone_number: text.to_string(),
            }
        }
        Err(e) => {
            // State stays AwaitingPhone so the user can simply resend
            log::error!("Failed to save resident record for user {}: {}", user_id, e);
            DialogueReply::SaveFailed
        }
    }
}

fn lookup_apartment(db_pool: &Arc<db::DbPool>, text: &str) -> DialogueReply {
    let apartment_number = match validation::parse_apartment_number(text) {
        Ok(n) => n,
        Err(e) => {
            log::debug!("Rejected lookup apartment input: {}", e);
            return DialogueReply::BadApartment;
        }
    };

    let read_result: AppResult<_> = get_connection(db_pool)
        .map_err(AppError::from)
        .and_then(|conn| db::get_residents_by_apartment(&conn, apartment_number).map_err(AppError::from));

    match read_result {
        Ok(residents) if residents.is_empty() => DialogueReply::NobodyRegistered { apartment_number },
        Ok(residents) => DialogueReply::Residents {
            apartment_number,
            residents,
        },
        Err(e) => {
            log::error!("Failed to look up apartment {}: {}", apartment_number, e);
            DialogueReply::LookupFailed
        }
    }
}

/// Resolves a display handle for a user via the chat, falling back to the
/// raw user id on any failure (user left the chat, privacy settings,
/// transport error). The failure is never surfaced to the requester.
pub async fn resolve_display_handle(bot: &Bot, chat_id: ChatId, user_id: i64) -> String {
    let Ok(uid) = u64::try_from(user_id) else {
        return user_id.to_string();
    };

    match bot.get_chat_member(chat_id, UserId(uid)).await {
        Ok(member) => member.user.username.clone().unwrap_or_else(|| user_id.to_string()),
        Err(e) => {
            log::warn!("Failed to resolve username for user {}: {}", user_id, e);
            user_id.to_string()
        }
    }
}

async fn format_resident_lines(bot: &Bot, chat_id: ChatId, residents: &[Resident]) -> String {
    let mut lines = Vec::with_capacity(residents.len());
    for resident in residents {
        let handle = resolve_display_handle(bot, chat_id, resident.user_id).await;
        lines.push(format_resident_line(&handle, resident));
    }
    lines.join("\n")
}

fn format_resident_line(handle: &str, resident: &Resident) -> String {
    format!(
        "@{}: Квартира {}, Телефон {}",
        handle,
        resident.apartment_number,
        resident.phone_number.as_deref().unwrap_or(MISSING_PHONE_PLACEHOLDER)
    )
}

fn registration_confirmation(apartment_number: i64, phone_number: &str) -> String {
    format!("Квартира {} и телефон {} успешно записаны!", apartment_number, phone_number)
}

fn nobody_registered(apartment_number: i64) -> String {
    format!("В квартире {} никто не зарегистрирован.", apartment_number)
}

/// Returns the sender's id as `i64`, or `None` for channel posts and other
/// messages without a user.
fn message_user_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok())
}
