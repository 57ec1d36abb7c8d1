//! Viewports
//!
//! A viewport is the slice of a larger file that is actually shown to the
//! reader. Positions inside it are reported relative to its first inner line
//! and tagged with its destination file.
//!
//! @module viewport

pub mod regions;
pub mod remap;

pub use regions::find_viewports;
pub use remap::remap_to_viewport;

use crate::text::LinePositionSpan;
use serde::{Deserialize, Serialize};

/// A named, displayed sub-region of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// File name remapped positions are reported against
    pub destination_file: String,
    /// Content between the markers
    pub inner_span: LinePositionSpan,
    /// Content including the markers
    pub outer_span: LinePositionSpan,
    /// `<file>@<name>`
    pub id: String,
}

impl Viewport {
    /// Strictly between the first and last inner line
    pub fn contains_line(&self, line: usize) -> bool {
        line > self.inner_span.start.line && line < self.inner_span.end.line
    }

    pub fn relative_line(&self, line: usize) -> usize {
        line.saturating_sub(self.inner_span.start.line + 1)
    }

    /// Region name part of the id
    pub fn name(&self) -> &str {
        self.id
            .rsplit_once('@')
            .map(|(_, name)| name)
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::LinePosition;

    #[test]
    fn test_boundary_lines_excluded() {
        let viewport = Viewport {
            destination_file: "snippet".to_string(),
            inner_span: LinePositionSpan::new(LinePosition::new(3, 15), LinePosition::new(8, 0)),
            outer_span: LinePositionSpan::new(LinePosition::new(3, 0), LinePosition::new(8, 12)),
            id: "main.js@snippet".to_string(),
        };

        assert!(!viewport.contains_line(3), "Opening line is outside");
        assert!(viewport.contains_line(4));
        assert!(viewport.contains_line(7));
        assert!(!viewport.contains_line(8), "Closing line is outside");
        assert_eq!(viewport.relative_line(4), 0);
        assert_eq!(viewport.name(), "snippet");
    }
}
