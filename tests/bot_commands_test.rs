//! Tests for command parsing

use domofon::telegram::Command;
use teloxide::utils::command::BotCommands;

#[test]
fn test_parse_start_command() {
    let cmd = Command::parse("/start", "domofon_bot").expect("should parse /start");
    assert!(matches!(cmd, Command::Start));
}

#[test]
fn test_parse_home_command() {
    let cmd = Command::parse("/home", "domofon_bot").expect("should parse /home");
    assert!(matches!(cmd, Command::Home));
}

#[test]
fn test_parse_snake_case_commands() {
    // The two-word verbs must be snake_case, not lowercase-concatenated
    let cmd = Command::parse("/who_lives", "domofon_bot").expect("should parse /who_lives");
    assert!(matches!(cmd, Command::WhoLives));

    let cmd = Command::parse("/list_residents", "domofon_bot").expect("should parse /list_residents");
    assert!(matches!(cmd, Command::ListResidents));
}

#[test]
fn test_parse_command_with_bot_mention() {
    // In group chats commands arrive suffixed with the bot username
    let cmd = Command::parse("/home@domofon_bot", "domofon_bot").expect("should parse suffixed command");
    assert!(matches!(cmd, Command::Home));
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Command::parse("/ping", "domofon_bot").is_err());
    assert!(Command::parse("/wholives", "domofon_bot").is_err());
}

#[test]
fn test_free_text_is_not_a_command() {
    assert!(Command::parse("5", "domofon_bot").is_err());
    assert!(Command::parse("+79991234567", "domofon_bot").is_err());
}
