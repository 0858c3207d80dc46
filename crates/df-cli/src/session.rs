//! Interactive session state
//!
//! Binds the Reminder Store to an active user and turns commands into
//! rendered output. Confirmation prompts live in the REPL.

use std::sync::Arc;

use df_core::{
    AttributeStore, ClientSettings, Config, Error, MemoryAttributeStore, MemoryUserDirectory, Reminder,
    ReminderCollection, ReminderPatch, ReminderStore, RemindersChangeSender, SqliteAttributeStore, SqliteHost,
    SqliteUserDirectory, StorageBackend, User, UserDirectory,
};
use nu_ansi_term::{Color, Style};
use tracing::{debug, info};

use crate::commands::{COMMANDS, Command};
use crate::error::{CliError, Result};

/// Open the configured backends, seed users and build the store
pub async fn build_store(config: &Config, change_tx: RemindersChangeSender) -> Result<ReminderStore> {
    let (users, flags): (Arc<dyn UserDirectory>, Arc<dyn AttributeStore>) = match config.storage.backend {
        StorageBackend::Sqlite => {
            info!("Using SQLite storage at {}", config.storage.db_path);
            let host = SqliteHost::new(&config.storage.db_path)?;
            (
                Arc::new(SqliteUserDirectory::new(host.clone())),
                Arc::new(SqliteAttributeStore::new(host)),
            )
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            (Arc::new(MemoryUserDirectory::new()), Arc::new(MemoryAttributeStore::new()))
        }
    };

    for seed in &config.users {
        users.upsert_user(seed.clone().into()).await?;
    }
    debug!("Seeded {} users", config.users.len());

    Ok(ReminderStore::new(users, flags).with_notifier(change_tx))
}

/// What the REPL should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Exit,
}

pub struct Session {
    store: ReminderStore,
    settings: ClientSettings,
    user: User,
}

impl Session {
    /// Start a session as `user_id`, or as the first known user
    pub async fn open(store: ReminderStore, settings: ClientSettings, user_id: Option<&str>) -> Result<Self> {
        let user = match user_id {
            Some(id) => store
                .users()
                .resolve_user(id)
                .await?
                .ok_or_else(|| Error::UserNotFound(id.to_string()))?,
            None => store
                .users()
                .enumerate_users()
                .await?
                .into_iter()
                .next()
                .ok_or(CliError::NoUser)?,
        };
        info!("Session opened as {} ({})", user.name, user.id);
        Ok(Self { store, settings, user })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Find a reminder the active user is allowed to see
    pub async fn visible_reminder(&self, reminder_id: &str) -> Result<Reminder> {
        self.store
            .list(&self.user.id)
            .await?
            .remove(reminder_id)
            .ok_or_else(|| Error::ReminderNotFound(reminder_id.to_string()).into())
    }

    pub async fn execute(&mut self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::List => self.render_list().await?,
            Command::Add(label) => {
                let reminder = self.store.create(&self.user.id, ReminderPatch::label(label)).await?;
                format!("Added {}", reminder.id)
            }
            Command::SetDone { id, is_done } => {
                self.visible_reminder(&id).await?;
                let reminder = self.store.update(&id, ReminderPatch::done(is_done)).await?;
                format!("{} {}", if reminder.is_done { "Done:" } else { "Reopened:" }, reminder.label)
            }
            Command::Edit { id, label } => {
                self.visible_reminder(&id).await?;
                let reminder = self.store.update(&id, ReminderPatch::label(label)).await?;
                format!("Updated {}", reminder.id)
            }
            Command::Delete(id) => {
                let reminder = self.visible_reminder(&id).await?;
                self.store.delete(&reminder.id, &reminder.user_id).await?;
                format!("Deleted {}", reminder.id)
            }
            Command::Replace(raw) => {
                let collection: serde_json::Value = serde_json::from_str(&raw)?;
                self.store.update_user_reminders(&self.user.id, collection).await?;
                "Reminders replaced".to_string()
            }
            Command::Clear => {
                self.store.clear(&self.user.id).await?;
                "Reminders cleared".to_string()
            }
            Command::Users => self.render_players().await?,
            Command::Login(id) => {
                let user = self
                    .store
                    .users()
                    .resolve_user(&id)
                    .await?
                    .ok_or_else(|| Error::UserNotFound(id.clone()))?;
                self.user = user;
                format!("Now acting as {}", self.user.name)
            }
            Command::SetInjectButton(enabled) => {
                if self.settings.set_inject_button(enabled) {
                    format!("inject-button is now {}", if enabled { "on" } else { "off" })
                } else {
                    "Setting unchanged".to_string()
                }
            }
            Command::Help => render_help(),
            Command::Exit => return Ok(Outcome::Exit),
        };
        Ok(Outcome::Output(output))
    }

    /// Reminders visible to the active user, one per line
    pub async fn render_list(&self) -> Result<String> {
        let reminders = self.store.list(&self.user.id).await?;
        if reminders.is_empty() {
            return Ok("No reminders.".to_string());
        }

        let names = if self.user.is_gm {
            Some(self.store.users().enumerate_users().await?)
        } else {
            None
        };
        Ok(render_reminders(&reminders, names.as_deref()))
    }

    /// The player list, with the reminders entry point on the active
    /// user's row when the client setting allows it
    pub async fn render_players(&self) -> Result<String> {
        let users = self.store.users().enumerate_users().await?;
        let mut lines = vec![Style::new().bold().paint("Players").to_string()];
        for user in users {
            let mut line = format!("  {}", user.name);
            if user.is_gm {
                line.push_str(&Color::Yellow.paint(" [GM]").to_string());
            }
            if user.id == self.user.id {
                line.push_str(" (you)");
                if self.settings.inject_button() {
                    line.push_str(&Color::Cyan.paint("  [reminders: /list]").to_string());
                }
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

/// Render reminders sorted by owner then label. `users` adds an owner
/// column (game master view).
fn render_reminders(reminders: &ReminderCollection, users: Option<&[User]>) -> String {
    let mut sorted: Vec<&Reminder> = reminders.values().collect();
    sorted.sort_by(|a, b| (&a.user_id, &a.label, &a.id).cmp(&(&b.user_id, &b.label, &b.id)));

    sorted
        .into_iter()
        .map(|r| {
            let check = if r.is_done { "[x]" } else { "[ ]" };
            let label = if r.is_done {
                Style::new().dimmed().strikethrough().paint(&r.label).to_string()
            } else {
                r.label.clone()
            };
            let owner = users.map(|users| {
                let name = users
                    .iter()
                    .find(|u| u.id == r.user_id)
                    .map(|u| u.name.as_str())
                    .unwrap_or(r.user_id.as_str());
                format!("{:<12} ", name)
            });
            format!(
                "{} {} {}{}",
                check,
                Color::DarkGray.paint(&r.id),
                owner.unwrap_or_default(),
                label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help() -> String {
    let mut lines = vec!["Available commands:".to_string()];
    for (cmd, desc) in COMMANDS {
        lines.push(format!("  {:<10} {}", cmd, desc));
    }
    lines.push(String::new());
    lines.push("Text without a leading / is added as a new reminder.".to_string());
    lines.join("\n")
}
