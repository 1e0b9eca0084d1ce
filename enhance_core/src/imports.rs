use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;

use crate::Document;
use crate::EditList;

/// A local name bound to an import specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBinding {
	pub specifier: String,
	pub binding: String,
}

/// Maps import specifiers to local bindings for one document.
///
/// Seeded from the default imports the document already declares and then
/// extended, never overwritten, as assets are planned. A specifier is bound at
/// most once.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
	bindings: HashMap<String, String>,
	seeded: HashSet<String>,
	/// Every local name in use, so minted names never shadow an existing
	/// declaration.
	reserved: HashSet<String>,
	minted: Vec<ImportBinding>,
}

impl BindingTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed the table from the import declarations in `document`.
	pub fn from_document(document: &Document) -> Self {
		let mut table = Self::new();

		for import in document.imports() {
			table.reserved.extend(import.local_names.iter().cloned());

			if let Some(binding) = &import.default_binding {
				if !table.bindings.contains_key(&import.specifier) {
					table
						.bindings
						.insert(import.specifier.clone(), binding.clone());
					table.seeded.insert(import.specifier.clone());
				}
			}
		}

		table
	}

	pub fn get(&self, specifier: &str) -> Option<&str> {
		self.bindings.get(specifier).map(String::as_str)
	}

	/// Whether `specifier` was already imported by the document.
	pub fn is_seeded(&self, specifier: &str) -> bool {
		self.seeded.contains(specifier)
	}

	pub fn is_reserved(&self, name: &str) -> bool {
		self.reserved.contains(name)
	}

	/// Return the binding for `specifier`, minting `preferred` (or
	/// `preferred_2`, `preferred_3`, ... when taken) if it has none.
	pub fn resolve(&mut self, specifier: &str, preferred: &str) -> String {
		if let Some(existing) = self.bindings.get(specifier) {
			return existing.clone();
		}

		let binding = self.unique_name(preferred);
		self.reserved.insert(binding.clone());
		self.bindings
			.insert(specifier.to_string(), binding.clone());
		self.minted.push(ImportBinding {
			specifier: specifier.to_string(),
			binding: binding.clone(),
		});

		tracing::trace!(specifier, binding, "minted import binding");
		binding
	}

	/// `preferred` if unused, otherwise the first free `preferred_{n}`.
	pub fn unique_name(&self, preferred: &str) -> String {
		if !self.is_reserved(preferred) {
			return preferred.to_string();
		}

		(2..)
			.map(|counter| format!("{preferred}_{counter}"))
			.find(|candidate| !self.is_reserved(candidate))
			.unwrap_or_else(|| preferred.to_string())
	}

	/// Reserve `name` without binding it, so later mints avoid it.
	pub fn reserve(&mut self, name: impl Into<String>) {
		self.reserved.insert(name.into());
	}

	/// Bindings created by [`resolve`](Self::resolve), in creation order.
	pub fn minted(&self) -> &[ImportBinding] {
		&self.minted
	}
}

/// Queue the insertion of `imports` into `source`.
///
/// The declarations go after the last import of the instance script (or the
/// module script when there is no instance script), at the start of the
/// script when it has no imports, or into a new `<script>` when there is no
/// component script. A new script goes at the top of the document, or right
/// after the frontmatter when there is one. Nothing else in the document is
/// touched.
pub fn emit_imports(
	source: &str,
	document: &Document,
	imports: &[ImportBinding],
	edits: &mut EditList,
) {
	if imports.is_empty() {
		return;
	}

	let declarations: String = imports
		.iter()
		.map(|import| {
			format!(
				"import {} from {};\n",
				import.binding,
				quote_specifier(&import.specifier)
			)
		})
		.collect();

	let Some(script) = document.import_script() else {
		tracing::debug!(count = imports.len(), "synthesizing script for imports");

		match document.frontmatter {
			Some(frontmatter) => {
				let separator = if source
					.get(..frontmatter.end)
					.is_some_and(|text| text.ends_with('\n'))
				{
					""
				} else {
					"\n"
				};
				edits.insert(
					frontmatter.end,
					format!("{separator}\n<script>\n{declarations}</script>\n"),
				);
			}
			None => edits.insert(0, format!("<script>\n{declarations}</script>\n\n")),
		}

		return;
	};

	if let Some(last) = script.imports.last() {
		let text = format!("\n{}", declarations.trim_end_matches('\n'));
		edits.insert(last.span.end, text);
	} else {
		let content = script.content.slice(source);
		let text = if content.starts_with('\n') || content.starts_with("\r\n") {
			format!("\n{}", declarations.trim_end_matches('\n'))
		} else {
			format!("\n{declarations}")
		};
		edits.insert(script.content.start, text);
	}

	tracing::debug!(
		count = imports.len(),
		offset = script.span.start,
		"emitting imports"
	);
}

/// Render `specifier` as a double quoted JavaScript string.
fn quote_specifier(specifier: &str) -> String {
	let mut quoted = String::with_capacity(specifier.len() + 2);
	quoted.push('"');
	for ch in specifier.chars() {
		match ch {
			'"' => quoted.push_str("\\\""),
			'\\' => quoted.push_str("\\\\"),
			'\n' => quoted.push_str("\\n"),
			_ => quoted.push(ch),
		}
	}
	quoted.push('"');
	quoted
}
