use logos::Lexer;
use logos::Logos;

/// Tokens for markup content, outside of any tag.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkupToken {
	/// `<!-- ... -->`, consumed whole so tags inside comments are never seen.
	#[token("<!--", skip_comment)]
	Comment,
	/// `<name`, the start of an opening tag.
	#[regex(r"<[a-zA-Z][a-zA-Z0-9:._-]*")]
	TagOpen,
	/// `</name>`
	#[regex(r"</[a-zA-Z][a-zA-Z0-9:._-]*[ \t\r\n\f]*>")]
	TagClose,
	/// `{`, the start of a template expression or block tag. The walker
	/// consumes the body when the braces balance.
	#[token("{")]
	Expression,
	#[regex(r"[^<{`~]+")]
	Text,
	/// A `<` that does not start a tag or comment.
	#[token("<")]
	Lt,
	/// A backtick run. Opens a code span or fence in markdown.
	#[regex(r"`+")]
	Backticks,
	/// A tilde run. Opens a fence in markdown.
	#[regex(r"~+")]
	Tildes,
}

/// Tokens inside an opening tag, after the tag name.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagToken {
	#[regex(r"[ \t\r\n\f]+")]
	Whitespace,
	/// An attribute name or a piece of an unquoted value.
	#[regex(r#"[^ \t\r\n\f"'<>=/{}`]+"#)]
	Name,
	#[token("=")]
	Equals,
	#[regex(r#""[^"]*""#)]
	DoubleQuoted,
	#[regex(r"'[^']*'")]
	SingleQuoted,
	#[token("{", skip_expression)]
	Expression,
	#[token("/")]
	Slash,
	#[token(">")]
	End,
	#[token("/>")]
	SelfCloseEnd,
}

/// Tokens for the body of a `<script>` element. Only as much JavaScript as is
/// needed to find top level import declarations.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum ScriptToken {
	#[token("import")]
	Import,
	#[token("from")]
	From,
	#[token("as")]
	As,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token(",")]
	Comma,
	#[token("*")]
	Star,
	#[token(";")]
	Semicolon,
	#[token(".")]
	Dot,
	#[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
	Ident,
	#[regex(r#""([^"\\\n]|\\.)*""#)]
	DoubleQuoted,
	#[regex(r"'([^'\\\n]|\\.)*'")]
	SingleQuoted,
	#[regex(r"`([^`\\]|\\.)*`")]
	Template,
	#[regex(r"//[^\n]*", allow_greedy = true)]
	LineComment,
	#[token("/*", skip_block_comment)]
	BlockComment,
	#[regex(r"[0-9]+")]
	Number,
	#[regex(r#"[^ \t\r\n\f{}(),*;.a-zA-Z0-9_$"'`/]+"#)]
	Punctuation,
	#[token("/")]
	Slash,
}

fn skip_comment(lexer: &mut Lexer<'_, MarkupToken>) -> bool {
	let remainder = lexer.remainder();
	let length = memstr(remainder.as_bytes(), b"-->").map_or(remainder.len(), |index| index + 3);
	lexer.bump(length);
	true
}

fn skip_block_comment(lexer: &mut Lexer<'_, ScriptToken>) -> bool {
	let remainder = lexer.remainder();
	let length = memstr(remainder.as_bytes(), b"*/").map_or(remainder.len(), |index| index + 2);
	lexer.bump(length);
	true
}

/// Consume a balanced `{ ... }` attribute expression. The opening brace has
/// already been matched. An unbalanced brace is an error token and lexing
/// resumes right after it.
fn skip_expression(lexer: &mut Lexer<'_, TagToken>) -> bool {
	let Some(length) = expression_length(lexer.remainder()) else {
		return false;
	};
	lexer.bump(length);
	true
}

/// Find the length of the expression body that follows an opening `{`,
/// including the closing `}`. JavaScript string and template literals are
/// skipped so braces inside them do not count.
pub(crate) fn expression_length(source: &str) -> Option<usize> {
	let bytes = source.as_bytes();
	let mut depth = 1usize;
	let mut index = 0;

	while index < bytes.len() {
		match bytes[index] {
			b'{' => depth += 1,
			b'}' => {
				depth -= 1;
				if depth == 0 {
					return Some(index + 1);
				}
			}
			quote @ (b'"' | b'\'' | b'`') => {
				index += 1;
				while index < bytes.len() && bytes[index] != quote {
					if bytes[index] == b'\\' {
						index += 1;
					}
					index += 1;
				}
			}
			_ => {}
		}

		index += 1;
	}

	None
}

/// Length of `source` up to the first blank line, where a markdown paragraph
/// ends.
pub(crate) fn paragraph_length(source: &str) -> usize {
	[source.find("\n\n"), source.find("\n\r\n")]
		.into_iter()
		.flatten()
		.min()
		.unwrap_or(source.len())
}

pub(crate) fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}

/// Like [`memstr`] but ignoring ASCII case, for closing tags such as
/// `</SCRIPT>`.
pub(crate) fn memstr_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.position(|window| window.eq_ignore_ascii_case(needle))
}
