/// Characters Telegram's MarkdownV2 renderer reserves.
pub const RESERVED_CHARS: &str = r"_*[]()~`>#+-=|{}.!";

/// Escapes every reserved markup character with a backslash so model output
/// renders verbatim. Triple backticks come out as three escaped backticks.
///
/// Escaping is not idempotent: feeding the result back in escapes every
/// reserved character a second time.
pub fn format_response(response: &str) -> String {
    let mut out = String::with_capacity(response.len() + response.len() / 8);
    for ch in response.chars() {
        if RESERVED_CHARS.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
