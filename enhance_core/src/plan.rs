use std::collections::HashMap;
use std::fmt::Display;

use derive_more::Deref;
use serde::Serialize;

use crate::AssetKind;
use crate::AssetReference;
use crate::BindingTable;
use crate::EnhanceConfig;
use crate::EnhanceError;
use crate::EnhanceResult;

/// Prefix for every identifier minted by the planner.
pub const IDENTIFIER_PREFIX: &str = "__media";

/// The sorted, deduplicated union of the configured widths and the main
/// width. Never empty; every value is positive.
#[derive(Debug, Clone, PartialEq, Eq, Deref, Serialize)]
pub struct WidthSet(Vec<u32>);

impl WidthSet {
	pub fn new(extra_widths: &[u32], main_width: u32) -> EnhanceResult<Self> {
		let mut widths = Vec::with_capacity(extra_widths.len() + 1);

		for &width in extra_widths.iter().chain(std::iter::once(&main_width)) {
			if width == 0 {
				return Err(EnhanceError::InvalidWidth(width));
			}
			widths.push(width);
		}

		widths.sort_unstable();
		widths.dedup();

		Ok(Self(widths))
	}
}

impl Display for WidthSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let widths: Vec<String> = self.0.iter().map(ToString::to_string).collect();
		write!(f, "{}", widths.join(";"))
	}
}

/// Modern formats a transformable raster is re-encoded into, most efficient
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SrcsetFormat {
	Avif,
	Webp,
}

impl SrcsetFormat {
	pub const ALL: [SrcsetFormat; 2] = [SrcsetFormat::Avif, SrcsetFormat::Webp];

	pub fn name(self) -> &'static str {
		match self {
			Self::Avif => "avif",
			Self::Webp => "webp",
		}
	}

	pub fn mime_type(self) -> &'static str {
		match self {
			Self::Avif => "image/avif",
			Self::Webp => "image/webp",
		}
	}

	fn binding_suffix(self) -> &'static str {
		match self {
			Self::Avif => "avifSet",
			Self::Webp => "webpSet",
		}
	}
}

/// One import the plan depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedImport {
	pub specifier: String,
	pub binding: String,
}

/// A srcset import for one target format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SrcsetImport {
	pub format: SrcsetFormat,
	pub specifier: String,
	pub binding: String,
}

/// The derived artifacts planned for one distinct asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedAssetPlan {
	pub asset: AssetReference,
	/// Identifier base every binding of this plan starts with.
	pub id: String,
	/// The original source, used as the plain `src`.
	pub fallback: PlannedImport,
	/// Yields `{ width, height }` at compile time.
	pub metadata: Option<PlannedImport>,
	/// One srcset bundle per format, most efficient first.
	pub srcsets: Vec<SrcsetImport>,
}

impl DerivedAssetPlan {
	pub fn is_video(&self) -> bool {
		self.asset.kind == AssetKind::Video
	}

	pub fn is_gif(&self) -> bool {
		self.asset.kind == AssetKind::AnimatedRaster
	}

	pub fn is_passthrough_format(&self) -> bool {
		self.asset.kind == AssetKind::PassthroughFormat
	}

	pub fn has_metadata(&self) -> bool {
		self.metadata.is_some()
	}

	pub fn has_srcset(&self) -> bool {
		!self.srcsets.is_empty()
	}
}

/// Builds one [`DerivedAssetPlan`] per distinct normalized URL.
///
/// The first occurrence of a URL creates the plan; later occurrences get the
/// same plan back, which is what keeps a document to a single import per
/// asset.
#[derive(Debug)]
pub struct Planner<'c> {
	config: &'c EnhanceConfig,
	widths: WidthSet,
	plans: Vec<DerivedAssetPlan>,
	by_url: HashMap<String, usize>,
}

impl<'c> Planner<'c> {
	pub fn new(config: &'c EnhanceConfig) -> EnhanceResult<Self> {
		Ok(Self {
			config,
			widths: config.width_set()?,
			plans: vec![],
			by_url: HashMap::new(),
		})
	}

	pub fn widths(&self) -> &WidthSet {
		&self.widths
	}

	/// Plans in the order their asset was first seen.
	pub fn plans(&self) -> &[DerivedAssetPlan] {
		&self.plans
	}

	pub fn into_plans(self) -> Vec<DerivedAssetPlan> {
		self.plans
	}

	/// Return the plan for `asset`, creating it on first sight. External
	/// assets have no plan.
	pub fn plan(
		&mut self,
		asset: &AssetReference,
		table: &mut BindingTable,
	) -> Option<&DerivedAssetPlan> {
		if asset.is_external() {
			return None;
		}

		if let Some(&index) = self.by_url.get(&asset.url) {
			return self.plans.get(index);
		}

		let plan = self.create_plan(asset, table);
		tracing::trace!(url = %asset.url, id = %plan.id, "planned asset");

		let index = self.plans.len();
		self.by_url.insert(asset.url.clone(), index);
		self.plans.push(plan);
		self.plans.get(index)
	}

	fn create_plan(&self, asset: &AssetReference, table: &mut BindingTable) -> DerivedAssetPlan {
		let id = table.unique_name(&identifier_base(&asset.path));
		let fallback = PlannedImport {
			binding: table.resolve(&asset.url, &id),
			specifier: asset.url.clone(),
		};
		// When the fallback reuses an existing import, `id` was not minted; keep
		// it from being handed to another asset.
		table.reserve(id.clone());

		let mut metadata = None;
		let mut srcsets = vec![];

		if asset.kind == AssetKind::TransformableRaster {
			if self.config.include_srcset {
				for format in SrcsetFormat::ALL {
					let specifier = with_query(
						&asset.url,
						&format!(
							"w={}&format={}&as=srcset&withoutEnlargement",
							self.widths,
							format.name()
						),
					);
					let binding = table.resolve(
						&specifier,
						&format!("{id}_{}", format.binding_suffix()),
					);
					srcsets.push(SrcsetImport {
						format,
						specifier,
						binding,
					});
				}
			}

			if self.config.include_metadata {
				let specifier = with_query(&asset.url, "as=meta:width;height");
				let binding = table.resolve(&specifier, &format!("{id}_meta"));
				metadata = Some(PlannedImport { specifier, binding });
			}
		}

		DerivedAssetPlan {
			asset: asset.clone(),
			id,
			fallback,
			metadata,
			srcsets,
		}
	}
}

/// Derive a JavaScript identifier from an asset path: ASCII alphanumerics are
/// kept and every other run of characters becomes a single `_`.
pub fn identifier_base(path: &str) -> String {
	let mut identifier = String::from(IDENTIFIER_PREFIX);
	let mut separate = true;

	for ch in path.chars() {
		if ch.is_ascii_alphanumeric() {
			if separate {
				identifier.push('_');
				separate = false;
			}
			identifier.push(ch);
		} else {
			separate = true;
		}
	}

	identifier
}

/// Append `query` to `url`, joining with `&` when `url` already has a query.
fn with_query(url: &str, query: &str) -> String {
	let separator = if url.contains('?') { '&' } else { '?' };
	format!("{url}{separator}{query}")
}
