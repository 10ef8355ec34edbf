use std::sync::LazyLock;

use regex::Regex;

/// Applied in order, each with its replacement.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(```[\s\S]*?```)", "$1"),
        (r"(`[^`\n]+`)", "$1"),
        (r"!\[([^\]]*?)\]\(([^)]+)\)", "$1 ($2)"),
        (r"\[([^\]]+)\]\(([^)]+)\)", "$1 ($2)"),
        (r"(__|\*\*|_|\*)(.+?)(__|\*\*|_|\*)", "$2"),
        (r"~~(.+?)~~", "$1"),
        (r"^#{1,6}\s(.*)$", "$1"),
        (r"^>\s(.*)$", "$1"),
        (r"^-{3,}$", ""),
        (r"^\s*[\*\-+]\s+(.+)$", "$1"),
        (r"^\s*\d+\.\s+(.+)$", "$1"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        let re = Regex::new(&format!("(?m){pattern}")).expect("markdown patterns are valid");
        (re, replacement)
    })
    .collect()
});

const LEFTOVER_SYNTAX: &[char] = &['*', '_', '`', '#', '>', '+', '-'];

/// Reduces markdown to plain text. Links and images keep their target
/// in parentheses.
pub fn strip_syntax(text: &str) -> String {
    let mut text = text.to_owned();
    for (re, replacement) in RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    text.replace(LEFTOVER_SYNTAX, "").trim().to_owned()
}
