//! Positions and spans over program text
//!
//! Every position here is 0-based. Lines are counted from the start of the
//! file; characters are counted in Unicode scalar values from the start of
//! the line. Byte offsets are kept next to line positions so callers can
//! splice text without recomputing anything.
//!
//! @module text

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// LINE POSITIONS
// =============================================================================

/// A line/character position, ordered line first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LinePosition {
    pub line: usize,
    pub character: usize,
}

impl LinePosition {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A range of line positions (end inclusive for overlap purposes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LinePositionSpan {
    pub start: LinePosition,
    pub end: LinePosition,
}

impl LinePositionSpan {
    pub const fn new(start: LinePosition, end: LinePosition) -> Self {
        Self { start, end }
    }

    /// Span covering whole lines `first..=last`
    pub const fn lines(first: usize, last: usize) -> Self {
        Self {
            start: LinePosition::new(first, 0),
            end: LinePosition::new(last, usize::MAX),
        }
    }

    /// True when the two spans share at least one position
    pub fn overlaps(&self, other: &LinePositionSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, position: LinePosition) -> bool {
        self.start <= position && position <= self.end
    }
}

// =============================================================================
// FILE POSITIONS
// =============================================================================

/// A position tagged with the file it belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FilePosition {
    pub line: usize,
    pub character: usize,
    #[serde(default)]
    pub file: String,
}

impl FilePosition {
    pub fn new(file: impl Into<String>, position: LinePosition) -> Self {
        Self {
            line: position.line,
            character: position.character,
            file: file.into(),
        }
    }

    pub fn line_position(&self) -> LinePosition {
        LinePosition::new(self.line, self.character)
    }
}

impl fmt::Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.character)
    }
}

// =============================================================================
// SOURCE SPANS
// =============================================================================

/// A byte range together with its line positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub start_position: LinePosition,
    pub end_position: LinePosition,
}

impl SourceSpan {
    pub fn line_span(&self) -> LinePositionSpan {
        LinePositionSpan::new(self.start_position, self.end_position)
    }

    /// True when `offset` lies inside the byte range (end exclusive)
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when `other` lies entirely inside this span
    pub fn encloses(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// =============================================================================
// SOURCE TEXT
// =============================================================================

/// Program text with a line index for offset → position conversion
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset into a line/character position
    ///
    /// Offsets past the end clamp to the end of the text; offsets inside a
    /// multi-byte character count that character as already passed.
    pub fn position_at(&self, offset: usize) -> LinePosition {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let character = self.text[line_start..]
            .char_indices()
            .take_while(|(i, _)| line_start + i < offset)
            .count();
        LinePosition::new(line, character)
    }

    /// Build a span from a byte range
    pub fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan {
            start,
            end,
            start_position: self.position_at(start),
            end_position: self.position_at(end),
        }
    }

    /// Byte offset of the start of `line`, or the end of the text
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Byte offset just before the line break that ends `line`
    pub fn line_end(&self, line: usize) -> usize {
        match self.line_starts.get(line + 1) {
            Some(next) => {
                let mut end = next - 1;
                if end > 0 && self.text.as_bytes()[end - 1] == b'\r' {
                    end -= 1;
                }
                end
            }
            None => self.text.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_counts_lines_and_characters() {
        let text = SourceText::new("let a = 1;\nlet b = 2;\n");

        assert_eq!(text.position_at(0), LinePosition::new(0, 0));
        assert_eq!(text.position_at(4), LinePosition::new(0, 4));
        assert_eq!(text.position_at(11), LinePosition::new(1, 0));
        assert_eq!(text.position_at(15), LinePosition::new(1, 4));
        assert_eq!(text.line_count(), 3);
    }

    #[test]
    fn test_position_at_counts_characters_not_bytes() {
        let text = SourceText::new("const s = \"héllo\"; x");
        let offset = text.as_str().find('x').unwrap();

        assert_eq!(text.position_at(offset), LinePosition::new(0, 19));
    }

    #[test]
    fn test_position_past_end_clamps() {
        let text = SourceText::new("ab");
        assert_eq!(text.position_at(99), LinePosition::new(0, 2));
    }

    #[test]
    fn test_line_bounds() {
        let text = SourceText::new("one\r\ntwo\nthree");

        assert_eq!(&text.as_str()[text.line_start(1)..text.line_end(1)], "two");
        assert_eq!(text.line_end(0), 3);
        assert_eq!(text.line_end(2), text.as_str().len());
    }

    #[test]
    fn test_span_overlap() {
        let a = LinePositionSpan::lines(2, 4);
        let b = LinePositionSpan::lines(4, 9);
        let c = LinePositionSpan::lines(5, 9);

        assert!(a.overlaps(&b), "Spans sharing a line should overlap");
        assert!(!a.overlaps(&c), "Disjoint spans should not overlap");
        assert!(c.contains(LinePosition::new(7, 3)));
    }
}
