use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

/// A half-open byte range `start..end` into a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
	pub start: usize,
	pub end: usize,
}

impl Span {
	pub const fn new(start: usize, end: usize) -> Self {
		Self { start, end }
	}

	/// An empty span at `offset`, used for insertions.
	pub const fn empty(offset: usize) -> Self {
		Self {
			start: offset,
			end: offset,
		}
	}

	pub const fn len(&self) -> usize {
		self.end.saturating_sub(self.start)
	}

	pub const fn is_empty(&self) -> bool {
		self.start >= self.end
	}

	/// Whether `other` lies entirely within this span.
	pub const fn contains(&self, other: &Span) -> bool {
		self.start <= other.start && other.end <= self.end
	}

	/// Shift both ends by `offset`. Used to lift spans found inside a slice of
	/// the document back into document coordinates.
	#[must_use]
	pub const fn shift(self, offset: usize) -> Self {
		Self {
			start: self.start + offset,
			end: self.end + offset,
		}
	}

	pub fn slice<'a>(&self, source: &'a str) -> &'a str {
		source.get(self.start..self.end).unwrap_or_default()
	}
}

impl From<Range<usize>> for Span {
	fn from(range: Range<usize>) -> Self {
		Self::new(range.start, range.end)
	}
}

impl From<Span> for Range<usize> {
	fn from(span: Span) -> Self {
		span.start..span.end
	}
}

/// A 1-indexed line and column together with the byte offset they were
/// computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Point {
	pub const fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// Compute the line and column of `offset` within `source`. Columns count
	/// characters, not bytes. Offsets past the end are clamped.
	pub fn from_offset(source: &str, offset: usize) -> Self {
		let offset = offset.min(source.len());
		let mut point = Self::new(1, 1, 0);

		for ch in source[..floor_char_boundary(source, offset)].chars() {
			point.advance(ch);
		}

		point.offset = offset;
		point
	}

	fn advance(&mut self, ch: char) {
		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}

		self.offset += ch.len_utf8();
	}
}

fn floor_char_boundary(source: &str, mut offset: usize) -> usize {
	while offset > 0 && !source.is_char_boundary(offset) {
		offset -= 1;
	}

	offset
}
