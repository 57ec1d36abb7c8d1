//! Region Discovery
//!
//! Finds `//#region <name>` … `//#endregion` marker pairs in JavaScript
//! comments. Regions may nest; an unmatched marker is ignored.
//!
//! @module viewport/regions

use super::Viewport;
use crate::core::error::{Error, Result};
use crate::javascript;
use crate::text::{LinePosition, LinePositionSpan, SourceText};
use once_cell::sync::Lazy;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Query, QueryCursor};

static REGION_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^//\s*#region\s+(\S+)").unwrap());
static REGION_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^//\s*#endregion\b").unwrap());

const COMMENT_QUERY: &str = "(comment) @comment";

enum Marker {
    Start(String),
    End,
}

/// Every viewport declared in `source`, ordered by opening line
pub fn find_viewports(file: &str, source: &str) -> Result<Vec<Viewport>> {
    let tree = javascript::parse_tree(source)?;
    let query = Query::new(&javascript::language(), COMMENT_QUERY).map_err(|e| Error::Parse {
        message: format!("Invalid comment query: {}", e),
    })?;

    let text = SourceText::new(source);
    let bytes = source.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), bytes);

    let mut open: Vec<(String, usize)> = Vec::new();
    let mut viewports = Vec::new();

    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            let Ok(comment) = node.utf8_text(bytes) else {
                continue;
            };
            let line = node.start_position().row;

            match classify(comment) {
                Some(Marker::Start(name)) => open.push((name, line)),
                Some(Marker::End) => {
                    let Some((name, start_line)) = open.pop() else {
                        tracing::debug!(file, line, "Ignoring #endregion without #region");
                        continue;
                    };
                    viewports.push(Viewport {
                        destination_file: name.clone(),
                        inner_span: LinePositionSpan::new(
                            text.position_at(text.line_end(start_line)),
                            LinePosition::new(line, 0),
                        ),
                        outer_span: LinePositionSpan::new(
                            LinePosition::new(start_line, 0),
                            text.position_at(text.line_end(line)),
                        ),
                        id: format!("{}@{}", file, name),
                    });
                }
                None => {}
            }
        }
    }

    for (name, line) in &open {
        tracing::debug!(file, line, name = %name, "Ignoring unterminated #region");
    }

    viewports.sort_by_key(|v| v.outer_span.start);
    Ok(viewports)
}

/// Look up one viewport by id (`<file>@<name>`) or bare name
pub fn find_viewport(file: &str, source: &str, id: &str) -> Result<Viewport> {
    find_viewports(file, source)?
        .into_iter()
        .find(|v| v.id == id || v.name() == id)
        .ok_or_else(|| Error::ViewportNotFound { id: id.to_string() })
}

fn classify(comment: &str) -> Option<Marker> {
    if let Some(captures) = REGION_START.captures(comment) {
        return Some(Marker::Start(captures[1].to_string()));
    }
    if REGION_END.is_match(comment) {
        return Some(Marker::End);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = concat!(
        "const setup = 1;\n",
        "//#region outer\n",
        "let a = setup;\n",
        "//#region inner\n",
        "a += 1;\n",
        "//#endregion\n",
        "//#endregion\n",
        "console.log(a);\n",
    );

    #[test]
    fn test_nested_regions() {
        let viewports = find_viewports("main.js", SOURCE).unwrap();
        let ids: Vec<&str> = viewports.iter().map(|v| v.id.as_str()).collect();

        assert_eq!(ids, vec!["main.js@outer", "main.js@inner"]);

        let outer = &viewports[0];
        assert_eq!(outer.inner_span.start, LinePosition::new(1, 15));
        assert_eq!(outer.inner_span.end, LinePosition::new(6, 0));
        assert_eq!(outer.outer_span.end, LinePosition::new(6, 12));
        assert_eq!(outer.destination_file, "outer");

        let inner = &viewports[1];
        assert!(inner.contains_line(4));
        assert!(!inner.contains_line(5));
    }

    #[test]
    fn test_unmatched_markers_ignored() {
        let source = "//#endregion\nlet a = 1;\n//#region dangling\n";
        assert!(find_viewports("main.js", source).unwrap().is_empty());
    }

    #[test]
    fn test_find_viewport_by_name() {
        assert_eq!(find_viewport("main.js", SOURCE, "inner").unwrap().id, "main.js@inner");
        assert!(matches!(
            find_viewport("main.js", SOURCE, "missing"),
            Err(Error::ViewportNotFound { .. })
        ));
    }

    #[test]
    fn test_markers_inside_strings_are_not_regions() {
        let source = "const s = '//#region fake';\n//#region real\nlet x = 1;\n//#endregion\n";
        let viewports = find_viewports("main.js", source).unwrap();

        assert_eq!(viewports.len(), 1);
        assert_eq!(viewports[0].name(), "real");
    }
}
