//! Chat command parsing.

use std::sync::LazyLock;

use narrator_core::chat::MessageKind;
use regex::Regex;

static COMMANDS: LazyLock<[(MessageKind, Regex); 3]> = LazyLock::new(|| {
    [
        (MessageKind::Narration, command(r"narrat(?:e|ion)")),
        (MessageKind::Description, command(r"desc(?:ribe|ription|)")),
        (MessageKind::Notification, command(r"not(?:e|ify|ification)")),
    ]
});

fn command(token: &str) -> Regex {
    Regex::new(&format!(r"(?is)^/{token} (.*)")).expect("invalid chat command regex")
}

/// A narrator command typed into chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    /// What to publish.
    pub kind: MessageKind,
    /// Everything after the command token and its space.
    pub text: String,
}

/// Parses `content` as a narrator chat command.
///
/// Matches case-insensitively on `/narrate`, `/narration`, `/describe`,
/// `/description`, `/desc`, `/note`, `/notify` or `/notification`, followed
/// by a single space. The rest of the content, newlines included, is the
/// text. Returns `None` for anything else.
#[must_use]
pub fn parse_chat_command(content: &str) -> Option<ChatCommand> {
    COMMANDS.iter().find_map(|(kind, pattern)| {
        pattern.captures(content).map(|captures| ChatCommand {
            kind: *kind,
            text: captures
                .get(1)
                .map_or_else(String::new, |text| text.as_str().to_owned()),
        })
    })
}
