//! Client settings
//!
//! Per-client preferences. They are not stored with the reminders and
//! do not affect what the Reminder Store returns; they only shape the UI.

use tokio::sync::watch;
use tracing::debug;

use crate::config::ClientConfig;

/// Setting key for showing the reminders entry point in the player list
pub const INJECT_BUTTON: &str = "inject-button";

/// Live client settings with change notification
#[derive(Debug)]
pub struct ClientSettings {
    inject_button: watch::Sender<bool>,
}

impl ClientSettings {
    pub fn new(config: &ClientConfig) -> Self {
        let (inject_button, _) = watch::channel(config.inject_button);
        Self { inject_button }
    }

    /// Whether the player list shows the reminders entry point
    pub fn inject_button(&self) -> bool {
        *self.inject_button.borrow()
    }

    /// Change the setting. Returns whether the value changed; subscribers
    /// are only woken on an actual change.
    pub fn set_inject_button(&self, enabled: bool) -> bool {
        let changed = self.inject_button.send_if_modified(|current| {
            if *current == enabled {
                false
            } else {
                *current = enabled;
                true
            }
        });
        if changed {
            debug!("Setting {} changed to {}", INJECT_BUTTON, enabled);
        }
        changed
    }

    /// Watch the inject-button setting, e.g. to re-render the player list
    pub fn subscribe_inject_button(&self) -> watch::Receiver<bool> {
        self.inject_button.subscribe()
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enabled() {
        assert!(ClientSettings::default().inject_button());
    }

    #[test]
    fn test_from_config() {
        let settings = ClientSettings::new(&ClientConfig { inject_button: false });
        assert!(!settings.inject_button());
    }

    #[tokio::test]
    async fn test_change_notifies() {
        let settings = ClientSettings::default();
        let mut rx = settings.subscribe_inject_button();

        assert!(!settings.set_inject_button(true));
        assert!(!rx.has_changed().unwrap());

        assert!(settings.set_inject_button(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(!settings.inject_button());
    }
}
