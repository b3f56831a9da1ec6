//! Text locations and screen geometry
//!
//! Lines and columns are zero-based and inclusive on both ends.

use serde::{Deserialize, Serialize};

/// A line/column span inside a file
///
/// Reversed endpoints are swapped, on the wire as well as in [`TextRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTextRange")]
pub struct TextRange {
    /// First line of the span
    pub start_line: u32,
    /// Column on the first line
    pub start_column: u32,
    /// Last line of the span
    pub end_line: u32,
    /// Column on the last line
    pub end_column: u32,
}

#[derive(Deserialize)]
struct RawTextRange {
    start_line: u32,
    #[serde(default)]
    start_column: u32,
    end_line: u32,
    #[serde(default = "TextRange::line_end")]
    end_column: u32,
}

impl From<RawTextRange> for TextRange {
    fn from(raw: RawTextRange) -> Self {
        Self::new(raw.start_line, raw.start_column, raw.end_line, raw.end_column)
    }
}

impl TextRange {
    /// Create a range, swapping the endpoints if they arrive reversed
    #[must_use]
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        let reversed = start_line > end_line || (start_line == end_line && start_column > end_column);
        if reversed {
            Self {
                start_line: end_line,
                start_column: end_column,
                end_line: start_line,
                end_column: start_column,
            }
        } else {
            Self {
                start_line,
                start_column,
                end_line,
                end_column,
            }
        }
    }

    /// Whole lines `start..=end`, every column included
    #[must_use]
    pub const fn lines(start_line: u32, end_line: u32) -> Self {
        Self::new(start_line, 0, end_line, u32::MAX)
    }

    /// Columns `start..=end` on a single line
    #[must_use]
    pub const fn on_line(line: u32, start_column: u32, end_column: u32) -> Self {
        Self::new(line, start_column, line, end_column)
    }

    const fn line_end() -> u32 {
        u32::MAX
    }
}

/// Reference from an advisory message to a span in a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    /// Workspace-relative file path
    pub file: String,
    /// Anchored span
    pub range: TextRange,
}

impl Anchor {
    /// Create a new anchor
    pub fn new(file: impl Into<String>, range: TextRange) -> Self {
        Self {
            file: file.into(),
            range,
        }
    }
}

/// On-screen rectangle reported by the editor view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Distance from the top of the viewport
    pub top: f64,
    /// Distance from the left of the viewport
    pub left: f64,
    /// Height of the rectangle
    pub height: f64,
}
