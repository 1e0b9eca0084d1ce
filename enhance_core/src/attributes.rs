use crate::Attribute;
use crate::AttributeValue;
use crate::Element;

impl Element {
	/// The first attribute called `name`. Attribute names are ASCII case
	/// insensitive.
	pub fn attribute(&self, name: &str) -> Option<&Attribute> {
		self.attributes
			.iter()
			.find(|attribute| attribute.name.eq_ignore_ascii_case(name))
	}

	/// The value of the `name` attribute, or [`AttributeValue::Absent`].
	pub fn attribute_value(&self, name: &str) -> AttributeValue {
		self.attribute(name)
			.map_or(AttributeValue::Absent, |attribute| attribute.value.clone())
	}

	/// The literal text of the `name` attribute when it is static.
	pub fn static_attribute(&self, name: &str) -> Option<&str> {
		self.attribute(name)
			.and_then(|attribute| attribute.value.as_static())
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	/// Whether the author marked this element as critical, either with a
	/// `priority` attribute or with `fetchpriority="high"`.
	pub fn has_priority_signal(&self) -> bool {
		self.has_attribute("priority")
			|| self
				.static_attribute("fetchpriority")
				.is_some_and(|value| value.trim().eq_ignore_ascii_case("high"))
	}
}

/// Merge `baseline` classes into an authored class list. Authored classes
/// keep their order and come first; duplicates are dropped.
pub fn merge_classes(existing: &str, baseline: &[String]) -> String {
	let mut classes: Vec<&str> = vec![];

	for class in existing
		.split_ascii_whitespace()
		.chain(baseline.iter().flat_map(|class| class.split_ascii_whitespace()))
	{
		if !classes.contains(&class) {
			classes.push(class);
		}
	}

	classes.join(" ")
}

/// Render a double quoted attribute value.
pub fn quote_attribute(value: &str) -> String {
	format!("\"{}\"", value.replace('"', "&quot;"))
}
