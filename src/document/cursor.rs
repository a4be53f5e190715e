//! Peekable, forward-only iteration over document lines.

use std::iter::Peekable;
use std::str::SplitInclusive;

/// Sequential reader over the lines of a document.
///
/// Lines keep their `\n` terminator so that copying them to the output
/// reproduces the input byte for byte. A final line without a terminator is
/// yielded as-is. There is no rewind: a line returned by [`Self::peek`] is
/// exactly the line the next call to `next()` returns.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Peekable<SplitInclusive<'a, char>>,
    consumed: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split_inclusive('\n').peekable(),
            consumed: 0,
        }
    }

    /// Look at the next line without consuming it.
    pub fn peek(&mut self) -> Option<&'a str> {
        self.lines.peek().copied()
    }

    /// Consume the next line only if `predicate` accepts it.
    pub fn next_if(&mut self, predicate: impl FnOnce(&str) -> bool) -> Option<&'a str> {
        let line = self.lines.next_if(|line| predicate(line))?;
        self.consumed += 1;
        Some(line)
    }

    /// 1-based number of the last consumed line (0 before the first).
    pub fn line_number(&self) -> usize {
        self.consumed
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        self.consumed += 1;
        Some(line)
    }
}

/// A line containing nothing but whitespace.
pub fn is_blank_line(line: &str) -> bool {
    line.trim().is_empty()
}

/// Strip the line terminator (`\n` or `\r\n`).
pub fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
