use serde::Deserialize;
use serde::Serialize;

use crate::Span;

/// Index of an [`Element`] inside [`Document::elements`].
pub type ElementId = usize;

/// The template AST consumed by the enhancer.
///
/// Produced by [`scan`](crate::scan) or by any host parser that can supply the
/// same byte offsets. Elements are stored in document order with parent links,
/// so ancestors can be inspected without a tree walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
	pub elements: Vec<Element>,
	pub scripts: Vec<ScriptBlock>,
	/// A leading `---` YAML block. Never scanned for markup.
	#[serde(default)]
	pub frontmatter: Option<Span>,
}

impl Document {
	pub fn element(&self, id: ElementId) -> Option<&Element> {
		self.elements.get(id)
	}

	/// Iterate over the ancestors of `id`, nearest first.
	pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = &Element> + '_ {
		let mut current = self.element(id).and_then(|element| element.parent);
		std::iter::from_fn(move || {
			let element = self.element(current?)?;
			current = element.parent;
			Some(element)
		})
	}

	/// Whether any ancestor of `id` is a `name` element. Names are compared
	/// exactly since capitalized tags are components, not markup.
	pub fn has_ancestor(&self, id: ElementId, name: &str) -> bool {
		self.ancestors(id).any(|element| element.name == name)
	}

	/// Top level JavaScript or TypeScript scripts, in document order.
	pub fn component_scripts(&self) -> impl Iterator<Item = &ScriptBlock> {
		self.scripts
			.iter()
			.filter(|script| script.is_component_script())
	}

	/// The script imports should be added to: the instance script when present,
	/// otherwise the module script. Scripts inside elements and data scripts
	/// such as `application/ld+json` never qualify.
	pub fn import_script(&self) -> Option<&ScriptBlock> {
		self.component_scripts()
			.find(|script| script.context == ScriptContext::Instance)
			.or_else(|| self.component_scripts().next())
	}

	/// Every import declaration in the component scripts, in document order.
	pub fn imports(&self) -> impl Iterator<Item = &ImportDeclaration> {
		self.component_scripts()
			.flat_map(|script| script.imports.iter())
	}
}

/// A located markup element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
	pub name: String,
	/// The whole element. For void and self-closing elements this equals
	/// `open_tag`.
	pub span: Span,
	/// The opening tag, from `<` to the closing `>` inclusive.
	pub open_tag: Span,
	/// Offset of the `>` or `/>` that ends the opening tag. New attributes are
	/// inserted here.
	pub attributes_end: usize,
	pub self_closing: bool,
	pub parent: Option<ElementId>,
	pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
	/// Attribute name as written. Empty for spread attributes (`{...props}`).
	pub name: String,
	/// The full attribute, name and value.
	pub span: Span,
	pub value: AttributeValue,
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttributeValue {
	/// Literal text. `span` covers the value including any quotes; for
	/// valueless attributes (`controls`) it is empty and sits at the end of the
	/// name.
	Static { text: String, span: Span },
	/// An expression (`{value}`), an interpolated string (`"a {b}"`), or a
	/// spread. Never rewritten.
	Dynamic { span: Span },
	/// The attribute is not present.
	Absent,
}

impl AttributeValue {
	pub fn as_static(&self) -> Option<&str> {
		match self {
			Self::Static { text, .. } => Some(text),
			_ => None,
		}
	}

	pub fn is_absent(&self) -> bool {
		matches!(self, Self::Absent)
	}

	pub fn is_dynamic(&self) -> bool {
		matches!(self, Self::Dynamic { .. })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptContext {
	Instance,
	Module,
}

/// A `<script>` element and the imports declared inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBlock {
	pub span: Span,
	/// The raw text between the opening and closing tags.
	pub content: Span,
	pub context: ScriptContext,
	/// Whether the script sits inside another element, such as
	/// `<svelte:head>`.
	#[serde(default)]
	pub nested: bool,
	/// The static `type` attribute, if any.
	#[serde(default)]
	pub script_type: Option<String>,
	pub imports: Vec<ImportDeclaration>,
}

impl ScriptBlock {
	/// Whether this script belongs to the component: top level, with no
	/// `type` or a JavaScript or TypeScript one.
	pub fn is_component_script(&self) -> bool {
		!self.nested && self.script_type.as_deref().is_none_or(is_script_type)
	}
}

fn is_script_type(script_type: &str) -> bool {
	const SCRIPT_TYPES: [&str; 10] = [
		"",
		"module",
		"text/javascript",
		"application/javascript",
		"text/ecmascript",
		"application/ecmascript",
		"text/typescript",
		"application/typescript",
		"ts",
		"typescript",
	];

	let script_type = script_type.trim();
	SCRIPT_TYPES
		.iter()
		.any(|candidate| script_type.eq_ignore_ascii_case(candidate))
}

/// A top level `import` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDeclaration {
	/// From `import` to the end of the statement, including a trailing `;`.
	pub span: Span,
	pub specifier: String,
	/// `foo` in `import foo from "x"`.
	pub default_binding: Option<String>,
	/// Every local name the declaration introduces.
	pub local_names: Vec<String>,
}
