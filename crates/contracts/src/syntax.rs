//! Line-level syntax shared by the rule checks.
//!
//! ```text
//! directive = WS* ("ALLOW" | "DENY" | "REQUIRE") WS+ ANY+      (case-insensitive)
//! field     = WORD+ WS* ":" ...
//! ```

use std::sync::LazyLock;

use regex_lite::Regex;

/// Capability directive keywords.
pub const DIRECTIVE_KEYWORDS: [&str; 3] = ["ALLOW", "DENY", "REQUIRE"];

/// The literal that marks an explicitly emptied session layer.
pub const CLEAR_SENTINEL: &str = "CLEAR";

/// Fields every output contract must declare.
pub const OUTPUT_CONTRACT_FIELDS: [&str; 4] = ["format", "on_failure", "schema", "variance"];

static DIRECTIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*({})\s+.+", DIRECTIVE_KEYWORDS.join("|"))).ok()
});

static FIELD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(\w+)\s*:").ok());

/// Does `line` read as an `ALLOW` / `DENY` / `REQUIRE` directive?
///
/// The keyword must be followed by whitespace and then at least one more
/// character, so a bare `ALLOW` or `ALLOWED x` is not a directive.
pub fn is_directive(line: &str) -> bool {
    DIRECTIVE.as_ref().is_some_and(|re| re.is_match(line))
}

/// Extract the lowercased key of a `key: value` line.
///
/// The key is a run of word characters at the very start of the trimmed
/// line, optionally followed by whitespace, then a colon.
pub fn field_key(line: &str) -> Option<String> {
    FIELD
        .as_ref()?
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|key| key.as_str().to_lowercase())
}

/// Is this a comment line inside a capability declaration?
pub fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#')
}
