//! A substring denylist applied to candidate source before a run is launched.
//!
//! This is advisory hygiene and not a security boundary: `globalThis["fet" + "ch"](url)` passes it.
//! Isolation comes from the isolated context, not from this list.

/// Substrings associated with reaching outside the capability set levels are written for.
pub const FORBIDDEN_TOKENS: [&str; 5] = ["import ", "require(", "document.write(", "<script", "fetch("];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hygiene {
    Allowed,
    /// The source was rejected, with a reason suitable for display.
    Rejected(String),
}

/// Checks `source` against [`FORBIDDEN_TOKENS`], reporting the first token found.
pub fn check(source: &str) -> Hygiene {
    match FORBIDDEN_TOKENS.iter().find(|token| source.contains(*token)) {
        Some(token) => Hygiene::Rejected(format!("Forbidden token: {token}")),
        None => Hygiene::Allowed,
    }
}
