//! Plain-text rendering of transcripts, listings and notices.

use chat_provider::ModelInfo;
use olaf::{NoticeLevel, Preferences, Role, SessionId, SessionSummary, Theme, Turn};

pub const BOT_NAME: &str = "Olaf";
const ANONYMOUS_LABEL: &str = "You";
const RESET: &str = "\x1b[0m";

/// Colors derived from the theme preference. Disabled when stdout is not a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    theme: Theme,
    ansi: bool,
}

impl Palette {
    #[must_use]
    pub fn new(theme: Theme, ansi: bool) -> Self {
        Self { theme, ansi }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    fn accent(self) -> Option<&'static str> {
        match self.theme {
            Theme::Base => None,
            Theme::Pink => Some("\x1b[35m"),
            Theme::Orange => Some("\x1b[33m"),
            Theme::Sky => Some("\x1b[36m"),
        }
    }

    #[must_use]
    pub fn paint(self, text: &str) -> String {
        match self.accent().filter(|_| self.ansi) {
            Some(color) => format!("{color}{text}{RESET}"),
            None => text.to_string(),
        }
    }
}

/// Speaker label for `role`, honoring the username and avatar toggles.
#[must_use]
pub fn speaker_label(preferences: &Preferences, role: Role, palette: Palette) -> String {
    let (name, avatar) = match role {
        Role::User => (
            if preferences.show_username() {
                preferences.username()
            } else {
                ANONYMOUS_LABEL
            },
            if preferences.user_avatar().is_some() { "◉" } else { "○" },
        ),
        Role::Assistant => (
            BOT_NAME,
            if preferences.bot_avatar().is_some() { "◆" } else { "◇" },
        ),
        Role::System => ("system", "·"),
    };

    let label = if preferences.show_avatars() {
        format!("{avatar} {name}")
    } else {
        name.to_string()
    };
    palette.paint(&label)
}

#[must_use]
pub fn render_turn(preferences: &Preferences, turn: &Turn, palette: Palette) -> String {
    if turn.augmented {
        return format!("  · {}", turn.content);
    }
    format!(
        "{}: {}",
        speaker_label(preferences, turn.role, palette),
        turn.content
    )
}

#[must_use]
pub fn render_transcript(preferences: &Preferences, turns: &[Turn], palette: Palette) -> String {
    if turns.is_empty() {
        return "(empty chat)".to_string();
    }
    turns
        .iter()
        .map(|turn| render_turn(preferences, turn, palette))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered session listing; the active session is starred.
#[must_use]
pub fn render_sessions(sessions: &[SessionSummary], active: SessionId) -> String {
    if sessions.is_empty() {
        return "No saved chats.".to_string();
    }
    sessions
        .iter()
        .enumerate()
        .map(|(index, summary)| {
            let marker = if summary.id == active { '*' } else { ' ' };
            format!("{marker} {:>2}. {}", index + 1, summary.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn render_models(models: &[ModelInfo], selected: Option<&str>) -> String {
    if models.is_empty() {
        return "No models available.".to_string();
    }
    models
        .iter()
        .map(|model| {
            let marker = if Some(model.model.as_str()) == selected { '*' } else { ' ' };
            if model.name == model.model {
                format!("{marker} {}", model.model)
            } else {
                format!("{marker} {} ({})", model.model, model.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn notice_prefix(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "i",
        NoticeLevel::Warning => "!",
        NoticeLevel::Error => "x",
    }
}

#[cfg(test)]
mod tests {
    use session_store::{KeyValueStore, MemoryStore};

    use super::*;

    fn preferences(entries: &[(&str, &str)]) -> Preferences {
        let mut store = MemoryStore::new();
        for (key, value) in entries {
            store.set(key, value).expect("seed preference");
        }
        Preferences::load(&store)
    }

    #[test]
    fn labels_follow_toggles() {
        let plain = Palette::new(Theme::Base, false);
        let defaults = preferences(&[("olaf-username", "ada")]);
        assert_eq!(speaker_label(&defaults, Role::User, plain), "○ ada");
        assert_eq!(speaker_label(&defaults, Role::Assistant, plain), "◇ Olaf");

        let hidden = preferences(&[
            ("olaf-username", "ada"),
            ("olaf-show-username", "false"),
            ("olaf-show-avatars", "false"),
        ]);
        assert_eq!(speaker_label(&hidden, Role::User, plain), "You");
        assert_eq!(speaker_label(&hidden, Role::Assistant, plain), "Olaf");
    }

    #[test]
    fn custom_avatars_change_glyphs() {
        let prefs = preferences(&[
            ("olaf-user-avatar", "data:image/png;base64,AA=="),
            ("olaf-bot-avatar", "data:image/png;base64,AA=="),
        ]);
        let plain = Palette::new(Theme::Base, false);

        assert_eq!(speaker_label(&prefs, Role::User, plain), "◉ Anonymous");
        assert_eq!(speaker_label(&prefs, Role::Assistant, plain), "◆ Olaf");
    }

    #[test]
    fn themes_color_labels_only_with_ansi() {
        assert_eq!(Palette::new(Theme::Sky, true).paint("x"), "\x1b[36mx\x1b[0m");
        assert_eq!(Palette::new(Theme::Sky, false).paint("x"), "x");
        assert_eq!(Palette::new(Theme::Base, true).paint("x"), "x");
    }

    #[test]
    fn markers_render_as_asides() {
        let prefs = preferences(&[]);
        let turn = Turn::search_marker("rust news");

        assert_eq!(
            render_turn(&prefs, &turn, Palette::new(Theme::Pink, true)),
            "  · Searched the web for \"rust news\""
        );
    }

    #[test]
    fn session_listing_marks_active() {
        let newer = SessionId::from_millis(1_714_557_660_000);
        let older = SessionId::from_millis(1_714_557_600_000);
        let sessions = vec![
            SessionSummary {
                id: newer,
                title: newer.title(),
            },
            SessionSummary {
                id: older,
                title: older.title(),
            },
        ];

        assert_eq!(
            render_sessions(&sessions, older),
            "   1. Chat 2024-05-01 10:01:00 UTC\n*  2. Chat 2024-05-01 10:00:00 UTC"
        );
        assert_eq!(render_sessions(&[], older), "No saved chats.");
    }

    #[test]
    fn model_listing_marks_selection() {
        let models = vec![
            ModelInfo {
                name: "llama3:latest".to_string(),
                model: "llama3:latest".to_string(),
            },
            ModelInfo {
                name: "Mistral".to_string(),
                model: "mistral:7b".to_string(),
            },
        ];

        assert_eq!(
            render_models(&models, Some("mistral:7b")),
            "  llama3:latest\n* mistral:7b (Mistral)"
        );
    }
}
