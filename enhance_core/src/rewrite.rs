use std::fmt::Display;

use serde::Serialize;

use crate::Attribute;
use crate::AttributeValue;
use crate::DerivedAssetPlan;
use crate::EditList;
use crate::Element;
use crate::EnhanceConfig;
use crate::Span;
use crate::attributes::merge_classes;
use crate::attributes::quote_attribute;

/// Attributes that do not carry over to the fallback `<img>` of a
/// `<picture>` block.
const PICTURE_DROPPED_ATTRIBUTES: [&str; 4] = ["src", "srcset", "sizes", "priority"];

/// Attributes that do not apply to a `<video>` with a nested `<source>`.
const VIDEO_DROPPED_ATTRIBUTES: [&str; 2] = ["src", "alt"];

/// Why an element was left as authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
	/// An `<img>` already inside a `<picture>`.
	InsideResponsiveContainer,
	MissingSource,
	DynamicSource,
	EmptySource,
	External,
	/// The source matched a `skip_images` suffix.
	SkipPattern,
	/// The element and the source kind do not match, e.g. `<img src="a.mp4">`.
	MismatchedKind,
}

impl Display for SkipReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let reason = match self {
			Self::InsideResponsiveContainer => "already inside a <picture>",
			Self::MissingSource => "no src attribute",
			Self::DynamicSource => "src is an expression",
			Self::EmptySource => "src is empty",
			Self::External => "external source",
			Self::SkipPattern => "matched a skip_images pattern",
			Self::MismatchedKind => "source kind does not match the element",
		};
		write!(f, "{reason}")
	}
}

/// Builds the replacement markup for one element at a time.
pub(crate) struct Rewriter<'a> {
	source: &'a str,
	config: &'a EnhanceConfig,
	default_sizes: String,
}

impl<'a> Rewriter<'a> {
	pub(crate) fn new(source: &'a str, config: &'a EnhanceConfig) -> Self {
		Self {
			source,
			config,
			default_sizes: config.default_sizes(),
		}
	}

	fn verbatim(&self, attribute: &Attribute) -> &'a str {
		attribute.span.slice(self.source)
	}

	/// Rewrite a GIF or passthrough-format `<img>` in place: only the `src`
	/// value changes, and missing defaults are appended to the tag.
	pub(crate) fn rewrite_image_in_place(
		&self,
		element: &Element,
		src: Span,
		plan: &DerivedAssetPlan,
		edits: &mut EditList,
	) {
		edits.replace(src, format!("{{{}}}", plan.fallback.binding));

		let mut additions: Vec<String> = vec![];
		self.merge_class(element, edits, &mut additions);

		if let Some(priority) = element.attribute("priority") {
			edits.remove(self.with_leading_whitespace(element, priority.span));
			if !element.has_attribute("fetchpriority") {
				additions.push("fetchpriority=\"high\"".into());
			}
		}

		self.push_loading_defaults(element, &mut additions);

		if !additions.is_empty() {
			edits.insert(
				self.insertion_point(element),
				format!(" {}", additions.join(" ")),
			);
		}
	}

	/// Replace a transformable raster `<img>` with a `<picture>` block.
	pub(crate) fn rewrite_picture(
		&self,
		element: &Element,
		plan: &DerivedAssetPlan,
		edits: &mut EditList,
	) {
		let sizes = element.attribute("sizes").map_or_else(
			|| format!("sizes={}", quote_attribute(&self.default_sizes)),
			|attribute| self.verbatim(attribute).to_string(),
		);

		let mut markup = String::from("<picture>");

		for srcset in &plan.srcsets {
			markup.push_str(&format!(
				"<source srcset={{{}}} type=\"{}\" {sizes} />",
				srcset.binding,
				srcset.format.mime_type()
			));
		}

		let mut attributes = vec![format!("src={{{}}}", plan.fallback.binding)];

		for attribute in &element.attributes {
			if PICTURE_DROPPED_ATTRIBUTES
				.iter()
				.any(|name| attribute.name.eq_ignore_ascii_case(name))
			{
				continue;
			}

			attributes.push(self.render_attribute(attribute));
		}

		if !element.has_attribute("class") && !self.config.classes.is_empty() {
			attributes.push(format!("class={}", quote_attribute(&self.classes())));
		}

		if !element.has_attribute("alt") {
			attributes.push("alt=\"\"".into());
		}

		if element.has_attribute("priority") && !element.has_attribute("fetchpriority") {
			attributes.push("fetchpriority=\"high\"".into());
		}

		self.push_loading_defaults(element, &mut attributes);

		if let Some(metadata) = &plan.metadata {
			for dimension in ["width", "height"] {
				if !element.has_attribute(dimension) {
					attributes.push(format!("{dimension}={{{}.{dimension}}}", metadata.binding));
				}
			}
		}

		markup.push_str(&format!("<img {} />", attributes.join(" ")));
		markup.push_str("</picture>");

		edits.replace(element.span, markup);
	}

	/// Rebuild a `<video>` opening tag with a nested `<source>`. Children and
	/// the closing tag are left alone.
	pub(crate) fn rewrite_video(
		&self,
		element: &Element,
		plan: &DerivedAssetPlan,
		edits: &mut EditList,
	) {
		let mut attributes: Vec<String> = vec![];

		for attribute in &element.attributes {
			if VIDEO_DROPPED_ATTRIBUTES
				.iter()
				.any(|name| attribute.name.eq_ignore_ascii_case(name))
			{
				continue;
			}

			attributes.push(self.render_attribute(attribute));
		}

		if !element.has_attribute("class") && !self.config.classes.is_empty() {
			attributes.push(format!("class={}", quote_attribute(&self.classes())));
		}

		if !element.has_attribute("controls") {
			attributes.push("controls".into());
		}

		let mut markup = format!("<{}", element.name);
		for attribute in &attributes {
			markup.push(' ');
			markup.push_str(attribute);
		}
		markup.push('>');

		match plan.asset.video_mime_type() {
			Some(mime_type) => {
				markup.push_str(&format!(
					"<source src={{{}}} type=\"{mime_type}\" />",
					plan.fallback.binding
				));
			}
			None => markup.push_str(&format!("<source src={{{}}} />", plan.fallback.binding)),
		}

		if element.self_closing {
			markup.push_str(&format!("</{}>", element.name));
		}

		edits.replace(element.open_tag, markup);
	}

	/// Authored attributes are copied verbatim, except a static `class` which
	/// gets the baseline classes merged in.
	fn render_attribute(&self, attribute: &Attribute) -> String {
		match &attribute.value {
			AttributeValue::Static { text, .. } if attribute.name.eq_ignore_ascii_case("class") => {
				format!(
					"{}={}",
					attribute.name,
					quote_attribute(&merge_classes(text, &self.config.classes))
				)
			}
			_ => self.verbatim(attribute).to_string(),
		}
	}

	fn classes(&self) -> String {
		merge_classes("", &self.config.classes)
	}

	/// Merge classes into an in-place element: edit a static `class`, add one
	/// when absent, and leave a dynamic one alone.
	fn merge_class(&self, element: &Element, edits: &mut EditList, additions: &mut Vec<String>) {
		if self.config.classes.is_empty() {
			return;
		}

		match element.attribute_value("class") {
			AttributeValue::Static { text, span } => {
				let merged = merge_classes(&text, &self.config.classes);
				if merged == text {
					return;
				}

				if span.is_empty() {
					edits.insert(span.start, format!("={}", quote_attribute(&merged)));
				} else {
					edits.replace(span, quote_attribute(&merged));
				}
			}
			AttributeValue::Absent => {
				additions.push(format!("class={}", quote_attribute(&self.classes())));
			}
			AttributeValue::Dynamic { .. } => {}
		}
	}

	/// `loading="lazy"` and `decoding="async"` unless authored or the element
	/// carries a priority signal.
	fn push_loading_defaults(&self, element: &Element, attributes: &mut Vec<String>) {
		if element.has_priority_signal() {
			return;
		}

		if !element.has_attribute("loading") {
			attributes.push("loading=\"lazy\"".into());
		}

		if !element.has_attribute("decoding") {
			attributes.push("decoding=\"async\"".into());
		}
	}

	/// Where appended attributes go: after the last non-whitespace character
	/// before the tag's `>` or `/>`.
	fn insertion_point(&self, element: &Element) -> usize {
		let inner = &self.source[element.open_tag.start..element.attributes_end];
		element.open_tag.start + inner.trim_end().len()
	}

	/// Extend `span` backwards over the whitespace that separates it from the
	/// previous attribute, so removing it leaves no gap.
	fn with_leading_whitespace(&self, element: &Element, span: Span) -> Span {
		let before = &self.source[element.open_tag.start..span.start];
		Span::new(element.open_tag.start + before.trim_end().len(), span.end)
	}
}
