use logos::Logos;

use crate::ImportDeclaration;
use crate::Span;
use crate::lexer::ScriptToken;

/// Find the top level import declarations in a script body. Spans are
/// relative to `source`.
///
/// Handles default, namespace, named, mixed and side-effect imports, and the
/// TypeScript `import type` form. Dynamic `import()` calls and `import.meta`
/// are not declarations and are ignored, as is anything nested inside braces
/// or parentheses.
pub(crate) fn scan_imports(source: &str) -> Vec<ImportDeclaration> {
	let tokens: Vec<(ScriptToken, Span)> = ScriptToken::lexer(source)
		.spanned()
		.filter_map(|(token, span)| {
			match token {
				Ok(ScriptToken::LineComment | ScriptToken::BlockComment) | Err(()) => None,
				Ok(token) => Some((token, span.into())),
			}
		})
		.collect();

	let mut imports = vec![];
	let mut depth = 0usize;
	let mut cursor = 0;

	while cursor < tokens.len() {
		match tokens[cursor].0 {
			ScriptToken::BraceOpen | ScriptToken::ParenOpen => depth += 1,
			ScriptToken::BraceClose | ScriptToken::ParenClose => depth = depth.saturating_sub(1),
			ScriptToken::Import if depth == 0 && !follows_dot(&tokens, cursor) => {
				if let Some((import, next)) = ImportParser::new(source, &tokens, cursor).parse() {
					imports.push(import);
					cursor = next;
					continue;
				}
			}
			_ => {}
		}

		cursor += 1;
	}

	imports
}

fn follows_dot(tokens: &[(ScriptToken, Span)], cursor: usize) -> bool {
	cursor > 0 && tokens[cursor - 1].0 == ScriptToken::Dot
}

/// Parses a single import declaration starting at an `import` token.
struct ImportParser<'a> {
	source: &'a str,
	tokens: &'a [(ScriptToken, Span)],
	start: usize,
	cursor: usize,
	default_binding: Option<String>,
	local_names: Vec<String>,
}

impl<'a> ImportParser<'a> {
	fn new(source: &'a str, tokens: &'a [(ScriptToken, Span)], start: usize) -> Self {
		Self {
			source,
			tokens,
			start,
			cursor: start + 1,
			default_binding: None,
			local_names: vec![],
		}
	}

	fn peek(&self) -> Option<ScriptToken> {
		self.tokens.get(self.cursor).map(|(token, _)| *token)
	}

	fn peek_text(&self) -> &'a str {
		self.tokens
			.get(self.cursor)
			.map_or("", |(_, span)| span.slice(self.source))
	}

	fn bump(&mut self) -> Option<(ScriptToken, Span)> {
		let token = self.tokens.get(self.cursor).copied();
		self.cursor += 1;
		token
	}

	fn expect_ident(&mut self) -> Option<String> {
		match self.bump()? {
			(ScriptToken::Ident, span) => Some(span.slice(self.source).to_string()),
			_ => None,
		}
	}

	/// Returns the declaration and the index of the first token after it.
	fn parse(mut self) -> Option<(ImportDeclaration, usize)> {
		if matches!(
			self.peek(),
			Some(ScriptToken::DoubleQuoted | ScriptToken::SingleQuoted)
		) {
			return self.finish();
		}

		// `import type { A } from "x"` and `import type A from "x"`.
		if self.peek_text() == "type"
			&& matches!(
				self.tokens.get(self.cursor + 1).map(|(token, _)| *token),
				Some(ScriptToken::Ident | ScriptToken::BraceOpen | ScriptToken::Star)
			) {
			self.cursor += 1;
		}

		match self.peek()? {
			ScriptToken::Ident => {
				let name = self.expect_ident()?;
				self.default_binding = Some(name.clone());
				self.local_names.push(name);

				if self.peek() == Some(ScriptToken::Comma) {
					self.cursor += 1;
					self.parse_non_default_clause()?;
				}
			}
			ScriptToken::Star | ScriptToken::BraceOpen => self.parse_non_default_clause()?,
			_ => return None,
		}

		if self.bump()?.0 != ScriptToken::From {
			return None;
		}

		self.finish()
	}

	/// `* as ns` or `{ a, b as c }`.
	fn parse_non_default_clause(&mut self) -> Option<()> {
		match self.bump()?.0 {
			ScriptToken::Star => {
				if self.bump()?.0 != ScriptToken::As {
					return None;
				}
				let name = self.expect_ident()?;
				self.local_names.push(name);
			}
			ScriptToken::BraceOpen => {
				loop {
					match self.peek()? {
						ScriptToken::BraceClose => {
							self.cursor += 1;
							break;
						}
						ScriptToken::Comma => self.cursor += 1,
						ScriptToken::Ident
						| ScriptToken::DoubleQuoted
						| ScriptToken::SingleQuoted
						| ScriptToken::Import
						| ScriptToken::From
						| ScriptToken::As => {
							let imported = self.bump()?.1.slice(self.source).to_string();
							let is_type_modifier = imported == "type"
								&& !matches!(
									self.peek(),
									Some(ScriptToken::Comma | ScriptToken::BraceClose | ScriptToken::As)
								);
							if is_type_modifier {
								continue;
							}

							if self.peek() == Some(ScriptToken::As) {
								self.cursor += 1;
								let (_, span) = self.bump()?;
								self.local_names.push(span.slice(self.source).to_string());
							} else {
								self.local_names.push(imported);
							}
						}
						_ => return None,
					}
				}
			}
			_ => return None,
		}

		Some(())
	}

	fn finish(mut self) -> Option<(ImportDeclaration, usize)> {
		let (token, span) = self.bump()?;
		if !matches!(token, ScriptToken::DoubleQuoted | ScriptToken::SingleQuoted) {
			return None;
		}

		let raw = span.slice(self.source);
		let specifier = raw[1..raw.len() - 1].to_string();
		let mut end = span.end;

		if self.peek() == Some(ScriptToken::Semicolon) {
			end = self.tokens[self.cursor].1.end;
			self.cursor += 1;
		}

		let start = self.tokens[self.start].1.start;

		Some((
			ImportDeclaration {
				span: Span::new(start, end),
				specifier,
				default_binding: self.default_binding,
				local_names: self.local_names,
			},
			self.cursor,
		))
	}
}
