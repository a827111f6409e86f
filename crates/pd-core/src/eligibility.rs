//! Eligibility Filter
//!
//! A participant is excluded when their name or contact carries a reserved
//! exclusion code, either as the whole field or as a whitespace-bounded
//! token. Matching is case-insensitive. A code never matches inside a longer
//! word, so "F" excludes "F" and "Budi F" but not "Firman".

use serde::{Deserialize, Serialize};

/// Declarative exclusion rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFilter {
    /// Reserved codes, stored trimmed and lowercased
    codes: Vec<String>,
}

impl EligibilityFilter {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self { codes: normalized }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// `true` when the participant may be drawn
    pub fn classify(&self, name: &str, contact: &str) -> bool {
        !self.is_excluded(name) && !self.is_excluded(contact)
    }

    fn is_excluded(&self, field: &str) -> bool {
        let field = field.trim().to_lowercase();
        if field.is_empty() {
            return false;
        }
        self.codes.iter().any(|code| contains_token(&field, code))
    }
}

/// Whether `needle` occurs in `haystack` bounded by whitespace or the edges.
///
/// Every start position is tried, so an unbounded match cannot hide an
/// overlapping bounded one.
fn contains_token(haystack: &str, needle: &str) -> bool {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();
        let left_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let right_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace);
        if left_ok && right_ok {
            return true;
        }
        match haystack[start..].chars().next() {
            Some(c) => from = start + c.len_utf8(),
            None => break,
        }
    }
    false
}
