//! Edit overlap rule shared by coaching messages and decorations

use crate::types::text::TextRange;

/// Whether an edit touches an anchored span
///
/// Lines decide first. When the edit and the anchor only meet on a boundary
/// line, columns decide: an edit ending before the anchor starts, or
/// starting after the anchor ends, leaves it alone.
#[must_use]
pub fn edit_invalidates(edit: &TextRange, anchor: &TextRange) -> bool {
    if edit.start_line > anchor.end_line || edit.end_line < anchor.start_line {
        return false;
    }
    if edit.end_line == anchor.start_line && edit.end_column < anchor.start_column {
        return false;
    }
    if edit.start_line == anchor.end_line && edit.start_column > anchor.end_column {
        return false;
    }
    true
}
