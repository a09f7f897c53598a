//! # Region Extraction
//!
//! @title Approximate Function-Body Regions
//! @author Ramprasad
//!
//! Computes the span of lines owned by an anchor occurrence without parsing.
//!
//! ## Algorithm
//!
//! Given an anchor at line `L` with indentation `I`, the region runs from `L`
//! to the line before the next non-blank line that matches the boundary
//! pattern with indentation `<= I`, or to end-of-file.
//!
//! ## Known Limitations
//!
//! - Trailing blank lines and comments before the next definition belong to
//!   the region.
//! - Top-level statements after a function body are included until the next
//!   definition starts.
//! - Definitions nested deeper than the anchor do not end its region, and a
//!   nested anchor's region ends at the first sibling or outer definition.

use crate::source::SourceUnit;
use regex::Regex;

/// Columns a tab advances to, as in Python's tokenizer.
const TAB_WIDTH: usize = 8;

/// The span owned by one anchor occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Inclusive 1-based line span.
    Bounded { start: usize, end: usize },

    /// The anchor is a definition header that opens a body which never
    /// arrives (truncated or malformed source), so its extent is unknown.
    Ambiguous,
}

impl Region {
    /// Returns true if `line` falls inside a bounded region.
    pub fn contains(&self, line: usize) -> bool {
        match *self {
            Region::Bounded { start, end } => (start..=end).contains(&line),
            Region::Ambiguous => false,
        }
    }
}

/// Extracts the region owned by the anchor at `anchor_line` (1-based).
pub fn extract_region(unit: &SourceUnit, anchor_line: usize, boundary: &Regex) -> Region {
    let Some(header) = unit.line(anchor_line) else {
        return Region::Ambiguous;
    };
    let anchor_indent = indentation(header);

    let mut end = unit.lines.len();
    let mut has_body = false;

    for (idx, line) in unit.lines.iter().enumerate().skip(anchor_line) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indentation(line);
        if indent <= anchor_indent && boundary.is_match(line) {
            // idx is the 0-based index of the boundary line, so the 1-based
            // number of the line before it.
            end = idx;
            break;
        }
        if indent > anchor_indent {
            has_body = true;
        }
    }

    // Only a definition header can be left without its body. Any other
    // anchor ending in `(` or `,` is a continued expression and stays bounded.
    if !has_body && boundary.is_match(header) && opens_body(header) {
        return Region::Ambiguous;
    }

    Region::Bounded {
        start: anchor_line,
        end,
    }
}

/// Leading whitespace width in columns.
fn indentation(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// True if the header line ends expecting an indented continuation.
fn opens_body(header: &str) -> bool {
    let code = match header.find('#') {
        Some(pos) => &header[..pos],
        None => header,
    };
    matches!(
        code.trim_end().chars().last(),
        Some(':') | Some('{') | Some('(') | Some(',') | Some('\\')
    )
}
