use serde_json::Value;

use crate::server_utils::split_field_words;

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetField { game_id: String, words: Vec<String> },
}

pub fn parse_hello_response(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let name = object.get("playerName")?.as_str()?;
    Some(name.to_string())
}

pub fn parse_console_command(raw: &str) -> Option<ConsoleCommand> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let command_type = object.get("cmdType")?.as_str()?;
    let payload = object.get("payload")?.as_object()?;

    match command_type {
        "set_field" => {
            let game_id = payload.get("gameId")?.as_str()?.to_string();
            let words = split_field_words(payload.get("words")?.as_str()?);
            if words.is_empty() {
                return None;
            }
            Some(ConsoleCommand::SetField { game_id, words })
        }
        _ => None,
    }
}
