use serde::Serialize;

use crate::AssetKind;
use crate::AssetReference;
use crate::AttributeValue;
use crate::BindingTable;
use crate::DerivedAssetPlan;
use crate::Document;
use crate::EditList;
use crate::Element;
use crate::ElementId;
use crate::EnhanceConfig;
use crate::EnhanceResult;
use crate::ImportBinding;
use crate::Planner;
use crate::Point;
use crate::Span;
use crate::Syntax;
use crate::emit_imports;
use crate::rewrite::Rewriter;
use crate::rewrite::SkipReason;
use crate::scan_with;

/// The result of enhancing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhanceOutput {
	/// The patched document.
	pub code: String,
	/// Import declarations added to the document, in emission order.
	pub imports: Vec<ImportBinding>,
	/// One plan per distinct asset, in the order first seen.
	pub plans: Vec<DerivedAssetPlan>,
	/// Number of elements that were rewritten.
	pub rewritten: usize,
	/// Media elements that were left as authored.
	pub skipped: Vec<SkippedElement>,
}

impl EnhanceOutput {
	/// Returns true when the patched document differs from `source`.
	pub fn is_changed(&self, source: &str) -> bool {
		self.code != source
	}
}

/// A media element the enhancer did not rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedElement {
	pub name: String,
	/// Byte offset of the element's `<`.
	pub offset: usize,
	pub point: Point,
	pub reason: SkipReason,
}

/// What the enhancer does with one element.
enum Action {
	InPlace { src: Span, asset: AssetReference },
	Picture { asset: AssetReference },
	Video { asset: AssetReference },
}

/// Enhance every `<img>` and `<video>` in `document`, which must describe
/// `source`.
///
/// Elements are visited in document order. Each element is either rewritten
/// or recorded in [`EnhanceOutput::skipped`]; the only failures are
/// configuration errors and edits that would overlap.
pub fn enhance(
	source: &str,
	document: &Document,
	config: &EnhanceConfig,
) -> EnhanceResult<EnhanceOutput> {
	let mut table = BindingTable::from_document(document);
	let mut planner = Planner::new(config)?;
	let rewriter = Rewriter::new(source, config);
	let mut edits = EditList::new();
	let mut rewritten = 0;
	let mut skipped = vec![];

	for (id, element) in document.elements.iter().enumerate() {
		let action = match classify_element(document, id, element, config) {
			Ok(Some(action)) => action,
			Ok(None) => continue,
			Err(reason) => {
				let point = Point::from_offset(source, element.span.start);
				tracing::debug!(
					element = %element.name,
					line = point.line,
					column = point.column,
					%reason,
					"skipping element"
				);
				skipped.push(SkippedElement {
					name: element.name.clone(),
					offset: element.span.start,
					point,
					reason,
				});
				continue;
			}
		};

		match action {
			Action::InPlace { src, asset } => {
				if let Some(plan) = planner.plan(&asset, &mut table) {
					rewriter.rewrite_image_in_place(element, src, plan, &mut edits);
				}
			}
			Action::Picture { asset } => {
				if let Some(plan) = planner.plan(&asset, &mut table) {
					rewriter.rewrite_picture(element, plan, &mut edits);
				}
			}
			Action::Video { asset } => {
				if let Some(plan) = planner.plan(&asset, &mut table) {
					rewriter.rewrite_video(element, plan, &mut edits);
				}
			}
		}

		rewritten += 1;
	}

	let imports = table.minted().to_vec();
	emit_imports(source, document, &imports, &mut edits);
	let code = edits.apply(source)?;

	Ok(EnhanceOutput {
		code,
		imports,
		plans: planner.into_plans(),
		rewritten,
		skipped,
	})
}

/// Scan `source` as a Svelte component and enhance it.
pub fn enhance_source(
	source: impl AsRef<str>,
	config: &EnhanceConfig,
) -> EnhanceResult<EnhanceOutput> {
	enhance_source_with(source, Syntax::Svelte, config)
}

/// Scan `source` as `syntax` and enhance it.
pub fn enhance_source_with(
	source: impl AsRef<str>,
	syntax: Syntax,
	config: &EnhanceConfig,
) -> EnhanceResult<EnhanceOutput> {
	let source = source.as_ref();
	let document = scan_with(source, syntax)?;

	enhance(source, &document, config)
}

/// Decide how to handle `element`. `Ok(None)` means it is not a media element
/// at all.
fn classify_element(
	document: &Document,
	id: ElementId,
	element: &Element,
	config: &EnhanceConfig,
) -> Result<Option<Action>, SkipReason> {
	let is_video = match element.name.as_str() {
		"img" => false,
		"video" => true,
		_ => return Ok(None),
	};

	if !is_video && document.has_ancestor(id, "picture") {
		return Err(SkipReason::InsideResponsiveContainer);
	}

	let (text, src) = match element.attribute_value("src") {
		AttributeValue::Static { text, span } => (text, span),
		AttributeValue::Dynamic { .. } => return Err(SkipReason::DynamicSource),
		AttributeValue::Absent => return Err(SkipReason::MissingSource),
	};

	let asset = AssetReference::parse(&text).ok_or(SkipReason::EmptySource)?;

	if asset.is_external() {
		return Err(SkipReason::External);
	}

	if config.is_skipped(&asset.url) {
		return Err(SkipReason::SkipPattern);
	}

	let action = match (is_video, asset.kind) {
		(true, AssetKind::Video) => Action::Video { asset },
		(false, AssetKind::AnimatedRaster | AssetKind::PassthroughFormat) => {
			Action::InPlace { src, asset }
		}
		(false, AssetKind::TransformableRaster) => Action::Picture { asset },
		_ => return Err(SkipReason::MismatchedKind),
	};

	Ok(Some(action))
}
