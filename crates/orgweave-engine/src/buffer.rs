//! Read-only view over the document text.
//!
//! The rope is the single source of truth; every parse position is a byte
//! offset into it. Recognizers receive explicit `limit` bounds instead of a
//! narrowing scope, so the view itself is never restricted.

use std::borrow::Cow;

use regex::Regex;
use xi_rope::Rope;

/// A byte range into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn contains(self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Buffer view backed by an `xi_rope::Rope`.
#[derive(Debug, Clone)]
pub struct Buffer {
    rope: Rope,
}

impl Buffer {
    pub fn from_str(text: &str) -> Self {
        Buffer { rope: Rope::from(text) }
    }

    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len() == 0
    }

    pub fn text(&self) -> String {
        String::from(&self.rope)
    }

    /// Slice of `[start, end)`, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> Cow<'_, str> {
        let end = end.min(self.len());
        let start = start.min(end);
        self.rope.slice_to_cow(start..end)
    }

    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos >= self.len() {
            return None;
        }
        let end = (pos + 4).min(self.len());
        self.slice(pos, end).chars().next()
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        if pos >= self.len() {
            return None;
        }
        self.slice(pos, pos + 1).bytes().next()
    }

    /// Start of the line containing `pos`.
    pub fn line_start_of(&self, pos: usize) -> usize {
        let pos = pos.min(self.len());
        let line = self.rope.line_of_offset(pos);
        self.rope.offset_of_line(line)
    }

    /// Position of the newline ending the line containing `pos`, or the
    /// buffer end for a final line without one.
    pub fn line_end_of(&self, pos: usize) -> usize {
        let next = self.next_line_start(pos);
        if next > pos && self.byte_at(next - 1) == Some(b'\n') {
            next - 1
        } else {
            next
        }
    }

    /// Start of the line after the one containing `pos` (buffer end at EOF).
    pub fn next_line_start(&self, pos: usize) -> usize {
        let pos = pos.min(self.len());
        let line = self.rope.line_of_offset(pos);
        if line + 1 > self.rope.line_of_offset(self.len()) {
            self.len()
        } else {
            self.rope.offset_of_line(line + 1).min(self.len())
        }
    }

    /// The full line containing `pos`, without its trailing newline.
    pub fn line_str(&self, pos: usize) -> Cow<'_, str> {
        self.slice(self.line_start_of(pos), self.line_end_of(pos))
    }

    /// Number of line starts in `[a, b)`.
    pub fn count_lines(&self, a: usize, b: usize) -> usize {
        let a = a.min(self.len());
        let b = b.min(self.len());
        if b <= a {
            return 0;
        }
        self.rope.line_of_offset(b) - self.rope.line_of_offset(a)
    }

    /// True when the line containing `pos` is empty or whitespace-only.
    pub fn is_blank_line(&self, pos: usize) -> bool {
        self.line_str(pos).trim().is_empty()
    }

    /// Skip blank lines forward from a line start, bounded by `limit`.
    /// Returns the next non-blank line start (or `limit`) and the number of
    /// blank lines skipped.
    pub fn skip_blank_lines(&self, mut pos: usize, limit: usize) -> (usize, usize) {
        let mut count = 0;
        while pos < limit && self.is_blank_line(pos) {
            pos = self.next_line_start(pos);
            count += 1;
        }
        (pos.min(limit), count)
    }

    /// Bounded regex search in `[start, limit)`. Returns the absolute span
    /// of the first match.
    pub fn regex_search(&self, re: &Regex, start: usize, limit: usize) -> Option<Span> {
        let limit = limit.min(self.len());
        if start >= limit {
            return None;
        }
        let hay = self.slice(start, limit);
        re.find(&hay)
            .map(|m| Span::new(start + m.start(), start + m.end()))
    }

    /// Replace `[start, end)` with `text`. Only [`crate::Document`] mutates
    /// the buffer; parsing never does.
    pub(crate) fn edit(&mut self, start: usize, end: usize, text: &str) {
        self.rope.edit(start..end, text);
    }
}
