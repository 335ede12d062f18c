// src/parser/line.rs
// =============================================================================
// Turns one line of a twtxt feed into an optional (reference, year) pair.
//
// Grammar, as a single regular expression:
//
//   [YYYY-MM-DD] <anything> (http|gemini|gopher)<no spaces>/twtxt.txt <anything>
//
// - The date stamp is optional; when present its year is captured.
// - The reference is the URL ending in the literal path segment /twtxt.txt.
// - References to hub hosts on the deny list are dropped, but the line itself
//   still counts (it is still somebody posting).
//
// Every non-empty line is an activity line, matched or not. That is a rule of
// the ranking, not an accident: a feed's volume is its line count.
// =============================================================================

use regex::Regex;
use std::sync::LazyLock;

use crate::config::DEFAULT_DENY_HOSTS;

// Group 2 is the year, group 3 the reference.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([0-9]{4})-[0-9]{2}-[0-9]{2})?.*((http|gemini|gopher)[^ ]+/twtxt\.txt).*$")
        .expect("valid regex")
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-[0-9]{2}-[0-9]{2}").expect("valid regex"));

/// What one non-empty line contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// URL of another feed, if the line referenced one
    pub reference: Option<String>,
    /// Year from the leading date stamp; None files the line under "undated"
    pub year: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct LineParser {
    deny_hosts: Vec<String>,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_HOSTS.iter().map(|h| h.to_string()).collect())
    }
}

impl LineParser {
    pub fn new(deny_hosts: Vec<String>) -> Self {
        Self { deny_hosts }
    }

    /// Parses one line. Returns None only for empty lines, which are not
    /// activity at all.
    pub fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        if line.is_empty() {
            return None;
        }

        let Some(groups) = LINE_RE.captures(line) else {
            return Some(ParsedLine {
                reference: None,
                year: leading_year(line),
            });
        };

        let year = groups.get(2).and_then(|m| m.as_str().parse().ok());
        let reference = groups
            .get(3)
            .map(|m| m.as_str())
            .filter(|url| !self.is_denied(url))
            .map(str::to_string);

        Some(ParsedLine { reference, year })
    }

    fn is_denied(&self, url: &str) -> bool {
        self.deny_hosts.iter().any(|host| url.contains(host.as_str()))
    }
}

fn leading_year(line: &str) -> Option<u16> {
    DATE_RE
        .captures(line)
        .and_then(|groups| groups.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
