use std::fmt;

use thiserror::Error;
use web_sys::Storage;

pub const THEME_KEY: &str = "theme";
const DARK_CLASS: &str = "dark";
const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Theme> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Stored preference wins; otherwise follow the system setting.
    pub fn resolve(stored: Option<&str>, system_dark: bool) -> Theme {
        stored.and_then(Theme::parse).unwrap_or(if system_dark { Theme::Dark } else { Theme::Light })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local storage is unavailable")]
    Unavailable,
    #[error("could not read '{key}': {detail}")]
    Read { key: String, detail: String },
    #[error("could not write '{key}': {detail}")]
    Write { key: String, detail: String },
}

/// Theme preference persisted in local storage.
///
/// The stored value is read once at construction; every change is applied to
/// `<html>` first and then written back.
pub struct ThemeStore {
    storage: Option<Storage>,
    current: Theme,
}

impl ThemeStore {
    pub fn load() -> Self {
        let storage = local_storage();
        let stored = match &storage {
            Some(storage) => read(storage, THEME_KEY).unwrap_or_else(|err| {
                log::warn!("{}", err);
                None
            }),
            None => None,
        };
        let current = Theme::resolve(stored.as_deref(), prefers_dark());
        apply(current);
        Self { storage, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Apply `theme`. The page is updated even when persisting fails.
    pub fn set(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.current = theme;
        apply(theme);
        let storage = self.storage.as_ref().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(THEME_KEY, theme.as_str())
            .map_err(|err| StorageError::Write { key: THEME_KEY.to_string(), detail: format!("{err:?}") })
    }

    pub fn toggle(&mut self) -> Result<Theme, StorageError> {
        let next = self.current.toggled();
        self.set(next)?;
        Ok(next)
    }
}

fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

fn read(storage: &Storage, key: &str) -> Result<Option<String>, StorageError> {
    storage
        .get_item(key)
        .map_err(|err| StorageError::Read { key: key.to_string(), detail: format!("{err:?}") })
}

fn prefers_dark() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media(DARK_QUERY).ok().flatten())
        .map(|mql| mql.matches())
        .unwrap_or(false)
}

fn apply(theme: Theme) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };
    if let Err(err) = root.class_list().toggle_with_force(DARK_CLASS, theme == Theme::Dark) {
        log::warn!("Could not apply theme {}: {:?}", theme, err);
    }
}
