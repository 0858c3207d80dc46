//! Interactive REPL
//!
//! Reads slash commands with reedline, runs them against the session and
//! re-renders after every change.

use std::borrow::Cow;
use std::io::Write;

use df_core::{RemindersChangeReceiver, User};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings, MenuBuilder, Prompt,
    PromptEditMode, PromptHistorySearch, Reedline, ReedlineEvent, ReedlineMenu, Signal, Span, Suggestion,
    default_emacs_keybindings,
};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, warn};

use crate::commands::{self, COMMANDS, Command};
use crate::error::CliError;
use crate::session::{Outcome, Session};

const COMMAND_MENU: &str = "command_menu";

/// Completes the command word of a line starting with `/`
struct SlashCompleter;

impl Completer for SlashCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let typed = line.get(..pos).unwrap_or(line);
        if !typed.starts_with('/') || typed.contains(char::is_whitespace) {
            return Vec::new();
        }

        COMMANDS
            .iter()
            .filter(|(name, _)| name.starts_with(typed))
            .map(|&(name, help)| Suggestion {
                value: name.to_string(),
                description: Some(help.to_string()),
                style: None,
                extra: None,
                span: Span::new(0, pos),
                append_whitespace: true,
            })
            .collect()
    }
}

/// `alice> ` for players, `gm [GM]> ` for game masters
struct UserPrompt(String);

impl UserPrompt {
    fn for_user(user: &User) -> Self {
        let text = if user.is_gm {
            Color::Yellow.bold().paint(format!("{} [GM]> ", user.name))
        } else {
            Color::Cyan.bold().paint(format!("{}> ", user.name))
        };
        Self(text.to_string())
    }
}

impl Prompt for UserPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, search: PromptHistorySearch) -> Cow<'_, str> {
        Cow::Owned(format!("(search: {}) ", search.term))
    }
}

/// Emacs bindings with Tab opening the command menu. Printable keys,
/// `/` included, insert themselves.
fn repl_keybindings() -> Keybindings {
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu(COMMAND_MENU.to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings
}

fn line_editor() -> Reedline {
    let menu = ColumnarMenu::default()
        .with_name(COMMAND_MENU)
        .with_columns(1)
        .with_column_width(Some(48));

    Reedline::create()
        .with_completer(Box::new(SlashCompleter))
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
        .with_hinter(Box::new(DefaultHinter::default().with_style(Style::new().dimmed())))
        .with_edit_mode(Box::new(Emacs::new(repl_keybindings())))
}

/// Run the interactive loop until /exit or Ctrl+D
pub async fn run_cli(mut session: Session, mut changes: RemindersChangeReceiver) -> anyhow::Result<()> {
    let mut editor = line_editor();
    let mut settings_rx = session.settings().subscribe_inject_button();

    print_welcome();
    println!("{}\n", session.render_players().await?);
    println!("{}\n", session.render_list().await?);

    loop {
        let line = match editor.read_line(&UserPrompt::for_user(session.user())) {
            Ok(Signal::Success(line)) => line,
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("\nError: {}\n", err);
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let command = match commands::parse(input) {
            Ok(command) => command,
            Err(e) => {
                report(&e);
                continue;
            }
        };

        let question = match &command {
            Command::Delete(id) => match session.visible_reminder(id).await {
                Ok(reminder) => Some(format!("Delete \"{}\"?", reminder.label)),
                Err(e) => {
                    report(&e);
                    continue;
                }
            },
            Command::Clear => Some("Remove all your reminders?".to_string()),
            _ => None,
        };
        if let Some(question) = question {
            if !confirm(&question) {
                println!("\nCancelled.\n");
                continue;
            }
        }

        match session.execute(command).await {
            Ok(Outcome::Output(text)) => println!("\n{}\n", text),
            Ok(Outcome::Exit) => break,
            Err(e) => {
                report(&e);
                continue;
            }
        }

        if drain_changes(&mut changes) {
            println!("{}\n", session.render_list().await?);
        }

        if settings_rx.has_changed().unwrap_or(false) {
            let _ = settings_rx.borrow_and_update();
            println!("{}\n", session.render_players().await?);
        }
    }

    println!("\nBye!\n");
    Ok(())
}

fn error_style(err: &CliError) -> Style {
    if err.is_user_error() {
        Color::Yellow.normal()
    } else {
        Color::Red.bold()
    }
}

fn report(err: &CliError) {
    if !err.is_user_error() {
        error!("Command failed: {}", err);
    }
    eprintln!("\n{}\n", error_style(err).paint(err.to_string()));
}

/// Consume pending change events; true if any reminder changed
fn drain_changes(changes: &mut RemindersChangeReceiver) -> bool {
    let mut changed = false;
    loop {
        match changes.try_recv() {
            Ok(change) => {
                debug!("Reminder change: {:?}", change);
                changed = true;
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Missed {} reminder change events", skipped);
                changed = true;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return changed,
        }
    }
}

/// Ask a yes/no question, defaulting to no
fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_welcome() {
    println!();
    println!("{}", Style::new().bold().paint("dont-forget"));
    println!("Type a reminder and press Enter to add it. Commands start with /, Tab lists them.");
    println!();
}
