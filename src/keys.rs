//! Store key scheme shared by the registry and preferences.
//!
//! Session entries live under [`SESSION_KEY_PREFIX`]; preference keys never
//! start with it, so enumeration and bulk deletion can filter on the prefix.

use std::fmt;

use time::OffsetDateTime;

/// Namespace prefix of every session entry.
pub const SESSION_KEY_PREFIX: &str = "olaf-session-";

pub const SELECTED_MODEL_KEY: &str = "selectedModel";
pub const THEME_KEY: &str = "olaf-theme";
pub const USERNAME_KEY: &str = "olaf-username";
pub const USER_AVATAR_KEY: &str = "olaf-user-avatar";
pub const BOT_AVATAR_KEY: &str = "olaf-bot-avatar";
pub const SHOW_USERNAME_KEY: &str = "olaf-show-username";
pub const SHOW_AVATARS_KEY: &str = "olaf-show-avatars";
pub const SIDEBAR_OPEN_KEY: &str = "olaf-sidebar-open";

/// Session identifier: the creation instant in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Store key holding this session's transcript.
    #[must_use]
    pub fn key(self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }

    /// Parses a store key. Returns `None` for preference keys and for
    /// prefixed keys whose suffix is not a plain decimal number.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let suffix = key.strip_prefix(SESSION_KEY_PREFIX)?;
        parse_millis(suffix).map(Self)
    }

    /// Parses user input: either a full key or the bare millisecond value.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::from_key(input).or_else(|| parse_millis(input).map(Self))
    }

    /// Display title derived from the creation instant, e.g.
    /// `Chat 2024-05-01 10:00:00 UTC`.
    #[must_use]
    pub fn title(self) -> String {
        let nanos = i128::from(self.0) * 1_000_000;
        match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
            Ok(instant) => format!(
                "Chat {:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
                instant.year(),
                u8::from(instant.month()),
                instant.day(),
                instant.hour(),
                instant.minute(),
                instant.second()
            ),
            Err(_) => format!("Chat {}", self.0),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SESSION_KEY_PREFIX}{}", self.0)
    }
}

fn parse_millis(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        let id = SessionId::from_millis(1_714_557_600_000);

        assert_eq!(id.key(), "olaf-session-1714557600000");
        assert_eq!(SessionId::from_key(&id.key()), Some(id));
        assert_eq!(id.to_string(), id.key());
    }

    #[test]
    fn preference_and_malformed_keys_are_not_sessions() {
        assert_eq!(SessionId::from_key(SELECTED_MODEL_KEY), None);
        assert_eq!(SessionId::from_key(THEME_KEY), None);
        assert_eq!(SessionId::from_key("olaf-session-"), None);
        assert_eq!(SessionId::from_key("olaf-session-12ab"), None);
        assert_eq!(SessionId::from_key("olaf-session--5"), None);
        assert_eq!(SessionId::from_key("olaf-session-+5"), None);
    }

    #[test]
    fn preference_keys_stay_outside_session_namespace() {
        for key in [
            SELECTED_MODEL_KEY,
            THEME_KEY,
            USERNAME_KEY,
            USER_AVATAR_KEY,
            BOT_AVATAR_KEY,
            SHOW_USERNAME_KEY,
            SHOW_AVATARS_KEY,
            SIDEBAR_OPEN_KEY,
        ] {
            assert!(!key.starts_with(SESSION_KEY_PREFIX), "{key}");
        }
    }

    #[test]
    fn parse_accepts_key_or_bare_millis() {
        let id = SessionId::from_millis(42);

        assert_eq!(SessionId::parse(" olaf-session-42 "), Some(id));
        assert_eq!(SessionId::parse("42"), Some(id));
        assert_eq!(SessionId::parse("forty-two"), None);
    }

    #[test]
    fn title_uses_utc_creation_instant() {
        assert_eq!(
            SessionId::from_millis(1_714_557_600_000).title(),
            "Chat 2024-05-01 10:00:00 UTC"
        );
        assert_eq!(SessionId::from_millis(0).title(), "Chat 1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn title_falls_back_for_out_of_range_instants() {
        assert_eq!(
            SessionId::from_millis(u64::MAX).title(),
            format!("Chat {}", u64::MAX)
        );
    }
}
