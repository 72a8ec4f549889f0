//! Positioned diagnostics and their textual rendering.

use crate::token::Token;

/// A parse-time diagnostic anchored at a token.
#[derive(Debug, PartialEq, Clone, thiserror::Error)]
#[error("parse error: {message}")]
pub struct Diagnostic {
    pub file: String,
    pub token: Token,
    pub message: String,
}

impl Diagnostic {
    /// Render against the source the token was scanned from:
    ///
    /// ```text
    /// <file>:<line>:<col>: parse error: <message>
    /// <line of source>
    ///      ^~~~
    /// ```
    pub fn render(&self, source: &str) -> String {
        let (line, col) = position(source, self.token.start);
        let text = line_text(source, self.token.start);
        let underline = "~".repeat(self.token.len.saturating_sub(1));
        format!(
            "{}:{}:{}: parse error: {}\n{}\n{}^{}",
            self.file,
            line,
            col,
            self.message,
            text,
            " ".repeat(col - 1),
            underline,
        )
    }
}

/// 1-based line and column of a byte offset.  Columns count bytes within the
/// line.  LF and lone CR terminate lines; CRLF counts as a single terminator.
pub(crate) fn position(source: &str, offset: usize) -> (usize, usize) {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let mut line = 1;
    let mut line_start = 0;
    for (i, &b) in bytes[..offset].iter().enumerate() {
        if b == b'\n' || (b == b'\r' && bytes.get(i + 1) != Some(&b'\n')) {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, offset - line_start + 1)
}

/// The full text of the line containing a byte offset, without terminator.
pub(crate) fn line_text(source: &str, offset: usize) -> &str {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let start = bytes[..offset]
        .iter()
        .rposition(|&b| b == b'\n' || b == b'\r')
        .map_or(0, |i| i + 1);
    let end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .map_or(bytes.len(), |i| offset + i);
    &source[start..end]
}
