use std::sync::Mutex;

use crate::models::theme::Theme;
use crate::storage::manager::{PersistentStore, THEME_KEY};

/// Holds the theme preference for the session and mirrors it to storage.
///
/// The stored value is read once at construction (light if missing or
/// unreadable). Afterwards the in-memory value is authoritative, so a failed
/// write does not undo a toggle.
#[derive(Debug)]
pub struct ThemeService {
    store: PersistentStore,
    current: Mutex<Theme>,
}

impl ThemeService {
    pub fn new(store: PersistentStore) -> Self {
        let current = store.get(THEME_KEY, Theme::default());
        Self {
            store,
            current: Mutex::new(current),
        }
    }

    pub fn get(&self) -> Theme {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch to `theme`. Returns whether it reached durable storage.
    pub fn set(&self, theme: Theme) -> bool {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = theme;
        self.store.set(THEME_KEY, &theme)
    }

    /// Switch light ↔ dark and return the new theme.
    pub fn toggle(&self) -> Theme {
        let next = self.get().toggled();
        self.set(next);
        next
    }
}
