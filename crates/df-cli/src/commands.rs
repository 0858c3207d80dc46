//! Slash command parsing

use crate::error::{CliError, Result};

/// Available commands for autocomplete and /help
pub const COMMANDS: &[(&str, &str)] = &[
    ("/list", "Show your reminders (GMs see everyone's)"),
    ("/add", "Add a reminder: /add <label>"),
    ("/done", "Mark a reminder done: /done <id>"),
    ("/undo", "Mark a reminder not done: /undo <id>"),
    ("/edit", "Change a label: /edit <id> <label>"),
    ("/delete", "Delete a reminder: /delete <id>"),
    ("/replace", "Replace all your reminders: /replace <json>"),
    ("/clear", "Remove all your reminders"),
    ("/users", "Show the player list"),
    ("/login", "Act as another user: /login <user-id>"),
    ("/set", "Client setting: /set inject-button on|off"),
    ("/help", "Show this help"),
    ("/exit", "Quit"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add(String),
    SetDone { id: String, is_done: bool },
    Edit { id: String, label: String },
    Delete(String),
    Replace(String),
    Clear,
    Users,
    Login(String),
    SetInjectButton(bool),
    Help,
    Exit,
}

/// Split off the first whitespace-delimited word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.find(char::is_whitespace) {
        Some(i) => (&input[..i], input[i..].trim()),
        None => (input, ""),
    }
}

fn single_arg(rest: &str, usage: &'static str) -> Result<String> {
    let (arg, extra) = split_word(rest);
    if arg.is_empty() || !extra.is_empty() {
        return Err(CliError::Usage(usage));
    }
    Ok(arg.to_string())
}

/// Parse one line of input. Input without a leading `/` adds a reminder.
pub fn parse(input: &str) -> Result<Command> {
    let input = input.trim();
    if !input.starts_with('/') {
        return Ok(Command::Add(input.to_string()));
    }

    let (name, rest) = split_word(input);
    match name.to_lowercase().as_str() {
        "/list" | "/ls" => Ok(Command::List),
        "/add" => {
            if rest.is_empty() {
                return Err(CliError::Usage("/add <label>"));
            }
            Ok(Command::Add(rest.to_string()))
        }
        "/done" => Ok(Command::SetDone {
            id: single_arg(rest, "/done <id>")?,
            is_done: true,
        }),
        "/undo" => Ok(Command::SetDone {
            id: single_arg(rest, "/undo <id>")?,
            is_done: false,
        }),
        "/edit" => {
            let (id, label) = split_word(rest);
            if id.is_empty() || label.is_empty() {
                return Err(CliError::Usage("/edit <id> <label>"));
            }
            Ok(Command::Edit {
                id: id.to_string(),
                label: label.to_string(),
            })
        }
        "/delete" | "/rm" => Ok(Command::Delete(single_arg(rest, "/delete <id>")?)),
        "/replace" => {
            if rest.is_empty() {
                return Err(CliError::Usage("/replace <json>"));
            }
            Ok(Command::Replace(rest.to_string()))
        }
        "/clear" => Ok(Command::Clear),
        "/users" | "/players" => Ok(Command::Users),
        "/login" => Ok(Command::Login(single_arg(rest, "/login <user-id>")?)),
        "/set" => {
            let (key, value) = split_word(rest);
            if key != df_core::settings::INJECT_BUTTON {
                return Err(CliError::Usage("/set inject-button on|off"));
            }
            match value.to_lowercase().as_str() {
                "on" | "true" | "yes" => Ok(Command::SetInjectButton(true)),
                "off" | "false" | "no" => Ok(Command::SetInjectButton(false)),
                _ => Err(CliError::Usage("/set inject-button on|off")),
            }
        }
        "/help" | "/?" => Ok(Command::Help),
        "/exit" | "/quit" | "/q" => Ok(Command::Exit),
        _ => Err(CliError::UnknownCommand(name.to_string())),
    }
}
