use std::path::Path;

use logos::Lexer;
use logos::Logos;

use crate::Attribute;
use crate::AttributeValue;
use crate::Document;
use crate::Element;
use crate::ElementId;
use crate::EnhanceError;
use crate::EnhanceResult;
use crate::ScriptBlock;
use crate::ScriptContext;
use crate::Span;
use crate::lexer::MarkupToken;
use crate::lexer::TagToken;
use crate::lexer::expression_length;
use crate::lexer::memstr_ignore_ascii_case;
use crate::lexer::paragraph_length;
use crate::script::scan_imports;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: [&str; 14] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

/// Elements whose content is raw text rather than markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// How the text between tags is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Syntax {
	/// Svelte components and plain HTML.
	#[default]
	Svelte,
	/// Markdown and mdsvex. Code spans and fenced code blocks are opaque, and
	/// an expression never crosses a blank line.
	Markdown,
}

impl Syntax {
	/// Pick the syntax from a file extension. `md`, `markdown` and `svx` are
	/// markdown, anything else is read as Svelte.
	pub fn from_path(path: &Path) -> Self {
		let is_markdown = path
			.extension()
			.and_then(|extension| extension.to_str())
			.is_some_and(|extension| {
				["md", "markdown", "svx"]
					.iter()
					.any(|candidate| extension.eq_ignore_ascii_case(candidate))
			});

		if is_markdown {
			Self::Markdown
		} else {
			Self::Svelte
		}
	}
}

/// Scan a Svelte or HTML document into a [`Document`].
///
/// The scanner is lenient: stray `<` and `{`, unmatched closing tags and tags
/// cut off by the end of the input are ignored. The only error is a
/// `<script>` or `<style>` element with no closing tag, since everything
/// after it would be misread.
pub fn scan(source: impl AsRef<str>) -> EnhanceResult<Document> {
	scan_with(source, Syntax::Svelte)
}

/// Scan `source` as `syntax`.
pub fn scan_with(source: impl AsRef<str>, syntax: Syntax) -> EnhanceResult<Document> {
	MarkupWalker::new(source.as_ref(), syntax).process()
}

/// The byte length of a leading `---` YAML frontmatter block, including the
/// line break after its closing fence.
pub fn frontmatter_length(source: &str) -> Option<usize> {
	let mut cursor = if source.starts_with("---\n") {
		4
	} else if source.starts_with("---\r\n") {
		5
	} else {
		return None;
	};

	while cursor < source.len() {
		let next = source[cursor..]
			.find('\n')
			.map_or(source.len(), |index| cursor + index + 1);
		let line = source[cursor..next].trim_end_matches(['\n', '\r']);

		if line == "---" {
			return Some(next);
		}

		cursor = next;
	}

	None
}

/// An opening tag read from the tag lexer.
struct OpenTag {
	attributes: Vec<Attribute>,
	attributes_end: usize,
	end: usize,
	self_closing: bool,
}

/// Walks the markup token stream, morphing into the tag lexer for each
/// opening tag, and builds the element list with parent links.
struct MarkupWalker<'a> {
	/// The full document text.
	source: &'a str,
	syntax: Syntax,
	/// Collected elements in document order.
	elements: Vec<Element>,
	/// Collected scripts in document order.
	scripts: Vec<ScriptBlock>,
	/// Elements that are open and may still receive children.
	stack: Vec<ElementId>,
}

impl<'a> MarkupWalker<'a> {
	fn new(source: &'a str, syntax: Syntax) -> Self {
		Self {
			source,
			syntax,
			elements: vec![],
			scripts: vec![],
			stack: vec![],
		}
	}

	fn process(mut self) -> EnhanceResult<Document> {
		let mut lexer = MarkupToken::lexer(self.source);
		let frontmatter = frontmatter_length(self.source);

		if let Some(length) = frontmatter {
			lexer.bump(length);
		}

		while let Some(token) = lexer.next() {
			let span: Span = lexer.span().into();

			match token {
				Ok(MarkupToken::TagOpen) => {
					let name = lexer.slice()[1..].to_string();
					let mut tag_lexer = lexer.morph::<TagToken>();
					let tag = read_open_tag(&mut tag_lexer);
					lexer = tag_lexer.morph();

					let Some(tag) = tag else {
						continue;
					};

					if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !tag.self_closing {
						let closing = format!("</{name}");
						let remainder = lexer.remainder();
						let Some(length) =
							memstr_ignore_ascii_case(remainder.as_bytes(), closing.as_bytes())
						else {
							return Err(EnhanceError::UnclosedRawText {
								tag: name,
								offset: span.start,
							});
						};

						let content = Span::new(tag.end, tag.end + length);
						lexer.bump(length);

						if name == "script" {
							self.push_script(span.start, content, &tag);
						}

						continue;
					}

					self.push_element(name, span.start, tag);
				}
				Ok(MarkupToken::TagClose) => {
					let name = lexer.slice()[2..].trim_end_matches('>').trim_end();
					self.close_element(name, span);
				}
				Ok(MarkupToken::Expression) => {
					let remainder = lexer.remainder();
					let limit = match self.syntax {
						Syntax::Svelte => remainder.len(),
						Syntax::Markdown => paragraph_length(remainder),
					};

					// Unbalanced braces are plain text.
					if let Some(length) = expression_length(&remainder[..limit]) {
						lexer.bump(length);
					}
				}
				Ok(MarkupToken::Backticks | MarkupToken::Tildes)
					if self.syntax == Syntax::Markdown =>
				{
					let end = markdown_code_end(self.source, span);
					lexer.bump(end - span.end);
				}
				Ok(
					MarkupToken::Comment
					| MarkupToken::Text
					| MarkupToken::Lt
					| MarkupToken::Backticks
					| MarkupToken::Tildes,
				)
				| Err(()) => {}
			}
		}

		Ok(Document {
			elements: self.elements,
			scripts: self.scripts,
			frontmatter: frontmatter.map(|length| Span::new(0, length)),
		})
	}

	fn push_element(&mut self, name: String, start: usize, tag: OpenTag) {
		let id = self.elements.len();
		let is_void = tag.self_closing || VOID_ELEMENTS.contains(&name.as_str());
		let open_tag = Span::new(start, tag.end);

		self.elements.push(Element {
			name,
			span: open_tag,
			open_tag,
			attributes_end: tag.attributes_end,
			self_closing: tag.self_closing,
			parent: self.stack.last().copied(),
			attributes: tag.attributes,
		});

		if !is_void {
			self.stack.push(id);
		}
	}

	fn push_script(&mut self, start: usize, content: Span, tag: &OpenTag) {
		let is_module = tag.attributes.iter().any(|attribute| {
			attribute.name == "module"
				|| (attribute.name == "context"
					&& attribute.value.as_static() == Some("module"))
		});
		let script_type = tag
			.attributes
			.iter()
			.find(|attribute| attribute.name.eq_ignore_ascii_case("type"))
			.and_then(|attribute| attribute.value.as_static())
			.map(str::to_string);
		let imports = scan_imports(content.slice(self.source))
			.into_iter()
			.map(|mut import| {
				import.span = import.span.shift(content.start);
				import
			})
			.collect();

		// The closing tag is consumed later as a regular `TagClose`; the script
		// span ends where that tag ends.
		let closing_end = self.source[content.end..]
			.find('>')
			.map_or(self.source.len(), |index| content.end + index + 1);

		self.scripts.push(ScriptBlock {
			span: Span::new(start, closing_end),
			content,
			context: if is_module {
				ScriptContext::Module
			} else {
				ScriptContext::Instance
			},
			nested: !self.stack.is_empty(),
			script_type,
			imports,
		});
	}

	/// Close the nearest open element named `name`, implicitly closing
	/// everything opened after it. Unmatched closing tags are ignored.
	fn close_element(&mut self, name: &str, span: Span) {
		let Some(position) = self
			.stack
			.iter()
			.rposition(|id| self.elements[*id].name == name)
		else {
			return;
		};

		for id in self.stack.drain(position..) {
			let element = &mut self.elements[id];
			element.span.end = span.end;
		}
	}
}

/// End offset of the markdown code opened by the backtick or tilde run at
/// `span`, or `span.end` when the run opens nothing.
///
/// A run of three or more at the start of a line opens a fenced block that
/// lasts until a closing fence of the same character and at least the same
/// length, or to the end of the input. Any other backtick run opens a code
/// span closed by a run of the same length within the paragraph.
fn markdown_code_end(source: &str, span: Span) -> usize {
	let run = span.slice(source);
	let Some(&fence) = run.as_bytes().first() else {
		return span.end;
	};

	if run.len() >= 3 && is_line_start(source, span.start) {
		return fenced_block_end(source, span.end, fence, run.len());
	}

	if fence == b'`' {
		let paragraph = &source[span.end..span.end + paragraph_length(&source[span.end..])];
		if let Some(length) = code_span_length(paragraph, run.len()) {
			return span.end + length;
		}
	}

	span.end
}

/// Whether only up to three spaces precede `offset` on its line.
fn is_line_start(source: &str, offset: usize) -> bool {
	let line_start = source[..offset].rfind('\n').map_or(0, |index| index + 1);
	let indent = &source[line_start..offset];
	indent.len() <= 3 && indent.bytes().all(|byte| byte == b' ')
}

fn fenced_block_end(source: &str, from: usize, fence: u8, length: usize) -> usize {
	let next_line = |cursor: usize| {
		source[cursor..]
			.find('\n')
			.map_or(source.len(), |index| cursor + index + 1)
	};
	let mut cursor = next_line(from);

	while cursor < source.len() {
		let next = next_line(cursor);
		let line = source[cursor..next].trim_end_matches(['\n', '\r']);
		let body = line.trim_start_matches(' ');
		let run = body.bytes().take_while(|byte| *byte == fence).count();

		if line.len() - body.len() <= 3 && run >= length && body[run..].trim().is_empty() {
			return next;
		}

		cursor = next;
	}

	source.len()
}

/// Length up to and including a backtick run of exactly `length`.
fn code_span_length(source: &str, length: usize) -> Option<usize> {
	let bytes = source.as_bytes();
	let mut index = 0;

	while index < bytes.len() {
		if bytes[index] != b'`' {
			index += 1;
			continue;
		}

		let start = index;
		while index < bytes.len() && bytes[index] == b'`' {
			index += 1;
		}

		if index - start == length {
			return Some(index);
		}
	}

	None
}

/// Read the attributes of an opening tag up to and including its `>` or
/// `/>`. Returns `None` when the input ends first.
fn read_open_tag(lexer: &mut Lexer<'_, TagToken>) -> Option<OpenTag> {
	let mut tokens: Vec<(TagToken, Span)> = vec![];

	let (end_token, end_span) = loop {
		match lexer.next()? {
			Ok(token @ (TagToken::End | TagToken::SelfCloseEnd)) => {
				break (token, Span::from(lexer.span()));
			}
			Ok(token) => tokens.push((token, lexer.span().into())),
			Err(()) => {}
		}
	};

	Some(OpenTag {
		attributes: build_attributes(lexer.source(), &tokens),
		attributes_end: end_span.start,
		end: end_span.end,
		self_closing: end_token == TagToken::SelfCloseEnd,
	})
}

fn build_attributes(source: &str, tokens: &[(TagToken, Span)]) -> Vec<Attribute> {
	let mut attributes = vec![];
	let mut cursor = 0;

	while cursor < tokens.len() {
		let (token, span) = tokens[cursor];
		cursor += 1;

		match token {
			TagToken::Name => {
				let name = span.slice(source).to_string();
				let mut lookahead = skip_whitespace(tokens, cursor);

				if !matches!(tokens.get(lookahead), Some((TagToken::Equals, _))) {
					attributes.push(Attribute {
						name,
						span,
						value: AttributeValue::Static {
							text: String::new(),
							span: Span::empty(span.end),
						},
					});
					continue;
				}

				lookahead = skip_whitespace(tokens, lookahead + 1);
				let Some(&(value_token, value_span)) = tokens.get(lookahead) else {
					cursor = lookahead;
					continue;
				};

				let (value, value_end, next) = match value_token {
					TagToken::DoubleQuoted | TagToken::SingleQuoted => {
						let raw = value_span.slice(source);
						let text = &raw[1..raw.len() - 1];
						let value = if text.contains('{') {
							AttributeValue::Dynamic { span: value_span }
						} else {
							AttributeValue::Static {
								text: text.to_string(),
								span: value_span,
							}
						};
						(value, value_span.end, lookahead + 1)
					}
					TagToken::Expression => {
						(
							AttributeValue::Dynamic { span: value_span },
							value_span.end,
							lookahead + 1,
						)
					}
					TagToken::Name | TagToken::Slash => {
						// Unquoted values may contain `/`, which the lexer splits out.
						let mut end = lookahead + 1;
						while let Some((TagToken::Name | TagToken::Slash, next_span)) = tokens.get(end)
						{
							if next_span.start != tokens[end - 1].1.end {
								break;
							}
							end += 1;
						}
						let value_span = Span::new(value_span.start, tokens[end - 1].1.end);
						(
							AttributeValue::Static {
								text: value_span.slice(source).to_string(),
								span: value_span,
							},
							value_span.end,
							end,
						)
					}
					_ => {
						(
							AttributeValue::Static {
								text: String::new(),
								span: Span::empty(span.end),
							},
							span.end,
							lookahead,
						)
					}
				};

				attributes.push(Attribute {
					name,
					span: Span::new(span.start, value_end),
					value,
				});
				cursor = next;
			}
			TagToken::Expression => {
				// `{src}` shorthand or `{...rest}` spread.
				let inner = span.slice(source);
				let inner = inner[1..inner.len().saturating_sub(1).max(1)].trim();
				let name = if inner.starts_with("...") || !is_identifier(inner) {
					String::new()
				} else {
					inner.to_string()
				};

				attributes.push(Attribute {
					name,
					span,
					value: AttributeValue::Dynamic { span },
				});
			}
			_ => {}
		}
	}

	attributes
}

fn skip_whitespace(tokens: &[(TagToken, Span)], mut cursor: usize) -> usize {
	while matches!(tokens.get(cursor), Some((TagToken::Whitespace, _))) {
		cursor += 1;
	}

	cursor
}

fn is_identifier(value: &str) -> bool {
	let mut chars = value.chars();
	chars
		.next()
		.is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_' || ch == '$')
		&& chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}
