// src/parser/mod.rs
// =============================================================================
// This module reads fetched twtxt bodies.
//
// Submodules:
// - line: the reference grammar for a single line
// - body: applies it to a whole file and decides aliveness
//
// Both are pure functions over text, so they are tested without any network.
// =============================================================================

mod body;
mod line;

pub use body::scan_body;
pub use line::LineParser;
