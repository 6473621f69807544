//! Global preferences, independent of any session.
//!
//! Loaded once at startup; every setter writes through to the store before
//! updating memory.

use std::fmt;
use std::str::FromStr;

use chat_provider::ModelInfo;
use session_store::KeyValueStore;
use tracing::warn;

use crate::error::EngineError;
use crate::keys::{
    BOT_AVATAR_KEY, SELECTED_MODEL_KEY, SHOW_AVATARS_KEY, SHOW_USERNAME_KEY, SIDEBAR_OPEN_KEY,
    THEME_KEY, USERNAME_KEY, USER_AVATAR_KEY,
};

pub const DEFAULT_USERNAME: &str = "Anonymous";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Base,
    Pink,
    Orange,
    Sky,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Base, Theme::Pink, Theme::Orange, Theme::Sky];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Pink => "pink",
            Self::Orange => "orange",
            Self::Sky => "sky",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme '{}' (expected base, pink, orange or sky)", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownTheme(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    selected_model: Option<String>,
    theme: Theme,
    username: Option<String>,
    user_avatar: Option<String>,
    bot_avatar: Option<String>,
    show_username: bool,
    show_avatars: bool,
    sidebar_open: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_model: None,
            theme: Theme::Base,
            username: None,
            user_avatar: None,
            bot_avatar: None,
            show_username: true,
            show_avatars: true,
            sidebar_open: true,
        }
    }
}

impl Preferences {
    /// Reads every preference key. Unreadable or invalid values fall back to defaults.
    #[must_use]
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        Self {
            selected_model: read_text(store, SELECTED_MODEL_KEY),
            theme: read_text(store, THEME_KEY)
                .and_then(|raw| match raw.parse() {
                    Ok(theme) => Some(theme),
                    Err(error) => {
                        warn!(error = %error, "ignoring stored theme");
                        None
                    }
                })
                .unwrap_or(defaults.theme),
            username: read_text(store, USERNAME_KEY),
            user_avatar: read_text(store, USER_AVATAR_KEY),
            bot_avatar: read_text(store, BOT_AVATAR_KEY),
            show_username: read_flag(store, SHOW_USERNAME_KEY).unwrap_or(defaults.show_username),
            show_avatars: read_flag(store, SHOW_AVATARS_KEY).unwrap_or(defaults.show_avatars),
            sidebar_open: read_flag(store, SIDEBAR_OPEN_KEY).unwrap_or(defaults.sidebar_open),
        }
    }

    #[must_use]
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Display name, `Anonymous` unless the user set one.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(DEFAULT_USERNAME)
    }

    #[must_use]
    pub fn user_avatar(&self) -> Option<&str> {
        self.user_avatar.as_deref()
    }

    #[must_use]
    pub fn bot_avatar(&self) -> Option<&str> {
        self.bot_avatar.as_deref()
    }

    #[must_use]
    pub fn show_username(&self) -> bool {
        self.show_username
    }

    #[must_use]
    pub fn show_avatars(&self) -> bool {
        self.show_avatars
    }

    #[must_use]
    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn set_selected_model(
        &mut self,
        store: &mut dyn KeyValueStore,
        model: &str,
    ) -> Result<(), EngineError> {
        let model = model.trim();
        store.set(SELECTED_MODEL_KEY, model)?;
        self.selected_model = Some(model.to_string());
        Ok(())
    }

    /// Picks the effective model from a fresh listing: the saved choice when the
    /// server still offers it, else the first listed model. Only explicit user
    /// choices are persisted, so a temporarily missing model is not forgotten.
    pub fn select_from_listing(&mut self, store: &dyn KeyValueStore, models: &[ModelInfo]) -> Option<&str> {
        let saved = read_text(store, SELECTED_MODEL_KEY);
        self.selected_model = saved
            .filter(|saved| models.iter().any(|model| &model.model == saved))
            .or_else(|| models.first().map(|model| model.model.clone()));
        self.selected_model()
    }

    /// Clears the effective selection, e.g. when the model list is unavailable.
    pub fn clear_selection(&mut self) {
        self.selected_model = None;
    }

    pub fn set_theme(&mut self, store: &mut dyn KeyValueStore, theme: Theme) -> Result<(), EngineError> {
        store.set(THEME_KEY, theme.as_str())?;
        self.theme = theme;
        Ok(())
    }

    /// Sets the display name. A blank name removes the stored value.
    pub fn set_username(&mut self, store: &mut dyn KeyValueStore, name: &str) -> Result<(), EngineError> {
        let name = name.trim();
        if name.is_empty() {
            store.remove(USERNAME_KEY)?;
            self.username = None;
        } else {
            store.set(USERNAME_KEY, name)?;
            self.username = Some(name.to_string());
        }
        Ok(())
    }

    /// Stores a user avatar data URL; `None` resets to the default avatar.
    pub fn set_user_avatar(
        &mut self,
        store: &mut dyn KeyValueStore,
        data_url: Option<String>,
    ) -> Result<(), EngineError> {
        write_optional(store, USER_AVATAR_KEY, data_url.as_deref())?;
        self.user_avatar = data_url;
        Ok(())
    }

    pub fn set_bot_avatar(
        &mut self,
        store: &mut dyn KeyValueStore,
        data_url: Option<String>,
    ) -> Result<(), EngineError> {
        write_optional(store, BOT_AVATAR_KEY, data_url.as_deref())?;
        self.bot_avatar = data_url;
        Ok(())
    }

    pub fn set_show_username(&mut self, store: &mut dyn KeyValueStore, show: bool) -> Result<(), EngineError> {
        store.set(SHOW_USERNAME_KEY, flag_text(show))?;
        self.show_username = show;
        Ok(())
    }

    pub fn set_show_avatars(&mut self, store: &mut dyn KeyValueStore, show: bool) -> Result<(), EngineError> {
        store.set(SHOW_AVATARS_KEY, flag_text(show))?;
        self.show_avatars = show;
        Ok(())
    }

    pub fn set_sidebar_open(&mut self, store: &mut dyn KeyValueStore, open: bool) -> Result<(), EngineError> {
        store.set(SIDEBAR_OPEN_KEY, flag_text(open))?;
        self.sidebar_open = open;
        Ok(())
    }
}

fn read_text(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|value| !value.trim().is_empty()),
        Err(error) => {
            warn!(key, error = %error, "preference read failed, using default");
            None
        }
    }
}

fn read_flag(store: &dyn KeyValueStore, key: &str) -> Option<bool> {
    match read_text(store, key)?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            warn!(key, value = other, "ignoring malformed flag");
            None
        }
    }
}

fn flag_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn write_optional(store: &mut dyn KeyValueStore, key: &str, value: Option<&str>) -> Result<(), EngineError> {
    match value {
        Some(value) => store.set(key, value)?,
        None => store.remove(key)?,
    }
    Ok(())
}
