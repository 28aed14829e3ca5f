use serde::Serialize;

/// Position in a text file (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range `[start, end)` into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    /// Starting byte offset
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span marking an insertion point
    pub fn point(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `offset` lies inside the span (start inclusive, end exclusive)
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` lies entirely within this span
    pub fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlap test used by the conflict detector.
    ///
    /// Two non-empty ranges overlap when they share at least one byte. An
    /// insertion point overlaps a non-empty range only when it falls strictly
    /// inside it; insertion points never overlap each other.
    pub fn overlaps(&self, other: Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (false, false) => self.start.max(other.start) < self.end.min(other.end),
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (true, true) => false,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Convert a byte offset to line and column position
///
/// # Arguments
/// * `content` - The file content as a string
/// * `byte_offset` - The byte offset to convert
///
/// # Returns
/// * `Position` with line and column (both 1-indexed)
/// * Offsets past the end report the position just after the last byte
pub fn byte_to_position(content: &str, byte_offset: usize) -> Position {
    let offset = byte_offset.min(content.len());
    let before = &content.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1);
    Position { line, column: offset - line_start + 1 }
}

/// Convert a span to start and end positions
pub fn span_to_positions(content: &str, span: Span) -> (Position, Position) {
    (
        byte_to_position(content, span.start),
        byte_to_position(content, span.end),
    )
}

/// Byte offset of the first character of the line containing `offset`
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[..offset].rfind('\n').map_or(0, |idx| idx + 1)
}

/// Leading whitespace of the line containing `offset`
pub fn indentation_at(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let rest = &content[start..];
    let width = rest
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(rest.len());
    &rest[..width]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_to_position_start() {
        let pos = byte_to_position("Hello\nWorld", 0);
        assert_eq!(pos, Position { line: 1, column: 1 });
    }

    #[test]
    fn test_byte_to_position_after_newline() {
        // H=0 e=1 l=2 l=3 o=4 \n=5 W=6
        let pos = byte_to_position("Hello\nWorld", 6);
        assert_eq!(pos, Position { line: 2, column: 1 });
    }

    #[test]
    fn test_byte_to_position_past_end() {
        let pos = byte_to_position("ab\ncd", 99);
        assert_eq!(pos, Position { line: 2, column: 3 });
    }

    #[test]
    fn test_span_to_positions() {
        let (start, end) = span_to_positions("Hello\nWorld", Span::new(0, 5));
        assert_eq!(start.to_string(), "1:1");
        assert_eq!(end.to_string(), "1:6");
    }

    #[test]
    fn test_overlap_of_ranges() {
        assert!(Span::new(0, 10).overlaps(Span::new(5, 15)));
        assert!(Span::new(5, 15).overlaps(Span::new(0, 10)));
        assert!(Span::new(0, 10).overlaps(Span::new(2, 3)));
        // adjacent ranges share no byte
        assert!(!Span::new(0, 10).overlaps(Span::new(10, 20)));
    }

    #[test]
    fn test_overlap_of_insertion_points() {
        let range = Span::new(10, 20);
        assert!(Span::point(15).overlaps(range));
        assert!(range.overlaps(Span::point(15)));
        assert!(!Span::point(10).overlaps(range));
        assert!(!Span::point(20).overlaps(range));
        assert!(!Span::point(7).overlaps(Span::point(7)));
    }

    #[test]
    fn test_indentation_at() {
        let text = "a\n    b = 1;\n\tc";
        assert_eq!(indentation_at(text, 8), "    ");
        assert_eq!(indentation_at(text, text.len() - 1), "\t");
        assert_eq!(indentation_at(text, 0), "");
    }
}
