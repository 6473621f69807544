use std::path::PathBuf;

use olaf::SessionId;

/// Largest number read as a position in the `/sessions` listing rather than an id.
const MAX_LISTING_INDEX: u64 = 99_999;

pub const HELP_TEXT: &str = "\
Commands:
  /new                          start a new chat
  /sessions                     list saved chats
  /load <n|id>                  open a saved chat
  /delete <n|id>                delete a saved chat
  /delete-all                   delete every saved chat
  /models                       list models offered by the server
  /model <name>                 select a model
  /search on|off                toggle web search augmentation
  /theme base|pink|orange|sky   change the color theme
  /username [name]              set the display name (empty resets)
  /avatar user|bot <path>|reset set or reset an avatar image
  /toggle username|avatars|sidebar
  /history                      show the current chat
  /help                         show this help
  /quit                         exit";

/// Reference to a saved session: a 1-based listing position or a session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRef {
    Index(usize),
    Id(SessionId),
}

impl SessionRef {
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().trim_start_matches('#');
        if let Ok(index) = input.parse::<u64>() {
            if (1..=MAX_LISTING_INDEX).contains(&index) {
                return usize::try_from(index).ok().map(Self::Index);
            }
        }
        SessionId::parse(input).map(Self::Id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarTarget {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource {
    File(PathBuf),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleTarget {
    Username,
    Avatars,
    Sidebar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    New,
    Sessions,
    Load(SessionRef),
    Delete(SessionRef),
    DeleteAll,
    Models,
    Model(String),
    Search(bool),
    Theme(String),
    Username(Option<String>),
    Avatar {
        target: AvatarTarget,
        source: AvatarSource,
    },
    Toggle(ToggleTarget),
    History,
    /// A known command with missing or malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

/// Parses `input` as a slash command. Returns `None` for ordinary prompts.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/quit" | "/exit" => SlashCommand::Quit,
        "/new" => SlashCommand::New,
        "/sessions" => SlashCommand::Sessions,
        "/load" => SessionRef::parse(rest)
            .map_or(SlashCommand::Usage("/load <n|id>"), SlashCommand::Load),
        "/delete" => SessionRef::parse(rest)
            .map_or(SlashCommand::Usage("/delete <n|id>"), SlashCommand::Delete),
        "/delete-all" => SlashCommand::DeleteAll,
        "/models" => SlashCommand::Models,
        "/model" if !rest.is_empty() => SlashCommand::Model(rest.to_string()),
        "/model" => SlashCommand::Usage("/model <name>"),
        "/search" => match rest.to_ascii_lowercase().as_str() {
            "on" => SlashCommand::Search(true),
            "off" => SlashCommand::Search(false),
            _ => SlashCommand::Usage("/search on|off"),
        },
        "/theme" if !rest.is_empty() => SlashCommand::Theme(rest.to_string()),
        "/theme" => SlashCommand::Usage("/theme base|pink|orange|sky"),
        "/username" => SlashCommand::Username((!rest.is_empty()).then(|| rest.to_string())),
        "/avatar" => parse_avatar(rest),
        "/toggle" => match rest.to_ascii_lowercase().as_str() {
            "username" => SlashCommand::Toggle(ToggleTarget::Username),
            "avatars" => SlashCommand::Toggle(ToggleTarget::Avatars),
            "sidebar" => SlashCommand::Toggle(ToggleTarget::Sidebar),
            _ => SlashCommand::Usage("/toggle username|avatars|sidebar"),
        },
        "/history" => SlashCommand::History,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn parse_avatar(rest: &str) -> SlashCommand {
    const USAGE: &str = "/avatar user|bot <path>|reset";

    let Some((target, source)) = rest.split_once(char::is_whitespace) else {
        return SlashCommand::Usage(USAGE);
    };
    let target = match target.to_ascii_lowercase().as_str() {
        "user" => AvatarTarget::User,
        "bot" => AvatarTarget::Bot,
        _ => return SlashCommand::Usage(USAGE),
    };
    let source = match source.trim() {
        "" => return SlashCommand::Usage(USAGE),
        "reset" => AvatarSource::Reset,
        path => AvatarSource::File(PathBuf::from(path)),
    };

    SlashCommand::Avatar { target, source }
}
