use crate::EnhanceError;
use crate::EnhanceResult;
use crate::Span;

/// A single offset-addressed change. An empty `span` is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
	pub span: Span,
	pub text: String,
}

/// An ordered collection of non-overlapping edits applied to a document in
/// one pass.
///
/// Edits are collected in any order, validated, and then applied from the
/// original text, so no offset ever needs adjusting. Insertions at the same
/// offset are applied in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct EditList {
	edits: Vec<Edit>,
}

impl EditList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn replace(&mut self, span: Span, text: impl Into<String>) {
		self.edits.push(Edit {
			span,
			text: text.into(),
		});
	}

	pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
		self.replace(Span::empty(offset), text);
	}

	pub fn remove(&mut self, span: Span) {
		self.replace(span, String::new());
	}

	pub fn len(&self) -> usize {
		self.edits.len()
	}

	pub fn is_empty(&self) -> bool {
		self.edits.is_empty()
	}

	pub fn edits(&self) -> &[Edit] {
		&self.edits
	}

	/// Sort the edits by position and reject any two that touch the same
	/// text. Two replacements overlap when their ranges intersect; an
	/// insertion overlaps a replacement when it falls strictly inside it.
	fn sorted(&self, source_len: usize) -> EnhanceResult<Vec<&Edit>> {
		let mut sorted: Vec<&Edit> = self.edits.iter().collect();
		// Stable, so insertions at one offset keep their order and come before a
		// replacement starting at that offset.
		sorted.sort_by_key(|edit| (edit.span.start, !edit.span.is_empty()));

		for edit in &sorted {
			if edit.span.end > source_len || edit.span.start > edit.span.end {
				return Err(EnhanceError::EditOutOfBounds(edit.span));
			}
		}

		for pair in sorted.windows(2) {
			let (first, second) = (pair[0].span, pair[1].span);
			if second.start < first.end {
				return Err(EnhanceError::OverlappingEdits { first, second });
			}
		}

		Ok(sorted)
	}

	/// Apply every edit to `source`.
	pub fn apply(&self, source: &str) -> EnhanceResult<String> {
		let sorted = self.sorted(source.len())?;
		let extra: usize = sorted.iter().map(|edit| edit.text.len()).sum();
		let mut output = String::with_capacity(source.len() + extra);
		let mut cursor = 0;

		for edit in sorted {
			output.push_str(&source[cursor..edit.span.start]);
			output.push_str(&edit.text);
			cursor = edit.span.end;
		}

		output.push_str(&source[cursor..]);
		Ok(output)
	}
}
