use crate::domain::{ButtonAction, EventKind, PromptRef};

/// Extracts the command name from `/name@bot args`; `None` for ordinary text.
pub fn parse_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let token = rest.split(char::is_whitespace).next().unwrap_or_default();
    let name = token.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

pub fn classify_text(text: &str) -> EventKind {
    match parse_command(text) {
        Some(name) => EventKind::Command(name),
        None => EventKind::Text(text.to_string()),
    }
}

/// Decodes a callback payload. Unknown payloads are dropped.
pub fn from_callback(data: &str, message_id: Option<i32>) -> Option<EventKind> {
    let action: ButtonAction = data.parse().ok()?;
    Some(EventKind::Button {
        action,
        prompt: message_id.map(PromptRef),
    })
}
