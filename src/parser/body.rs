// src/parser/body.rs
// =============================================================================
// Runs the line parser over a whole fetched body.
//
// Aliveness is a property of the body as a whole: if any activity line is
// dated the reference year, the feed is alive, no matter where in the file
// that line sits.
// =============================================================================

use super::line::{LineParser, ParsedLine};

/// Everything the registry needs to know about one fetched body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyScan {
    /// One entry per non-empty line, in file order
    pub lines: Vec<ParsedLine>,
    pub alive: bool,
}

impl BodyScan {
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| l.reference.as_deref())
    }
}

/// Bodies are decoded lossily: a stray invalid byte should not hide the
/// rest of the feed.
pub fn scan_body(body: &[u8], parser: &LineParser, reference_year: u16) -> BodyScan {
    let text = String::from_utf8_lossy(body);

    let lines: Vec<ParsedLine> = text
        .lines()
        .filter_map(|line| parser.parse_line(line))
        .collect();
    let alive = lines.iter().any(|l| l.year == Some(reference_year));

    BodyScan { lines, alive }
}
