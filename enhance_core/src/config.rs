use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::EnhanceError;
use crate::EnhanceResult;
use crate::WidthSet;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["enhance.toml", ".enhance.toml", ".config/enhance.toml"];

/// Default extra srcset widths.
pub const DEFAULT_WIDTHS: [u32; 3] = [480, 768, 1024];

/// Default primary width.
pub const DEFAULT_MAIN_WIDTH: u32 = 1280;

/// Default baseline class merged into every rewritten element.
pub const DEFAULT_CLASS: &str = "enhanced-media";

/// Configuration loaded from an `enhance.toml` file.
///
/// ```toml
/// widths = [480, 768, 1024]
/// main_width = 1280
/// include_metadata = true
/// skip_images = [".placeholder.png"]
/// sizes = "(min-width: 768px) 50vw, 100vw"
/// classes = ["enhanced-media"]
///
/// [project]
/// extensions = ["svelte", "svx", "md"]
/// exclude = ["build/", "*.generated.svelte"]
/// disable_gitignore = false
/// ```
///
/// The option names used by the JavaScript preprocessor (`mainWidth`,
/// `includeMetadata`, `skipImages`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
	/// Extra srcset widths. The main width is always folded in.
	pub widths: Vec<u32>,
	/// The primary width, used for the default `sizes` expression.
	#[serde(alias = "mainWidth")]
	pub main_width: u32,
	/// Emit a metadata import so `width` and `height` can be filled in.
	#[serde(alias = "includeMetadata")]
	pub include_metadata: bool,
	/// Emit AVIF and WebP srcset imports for transformable rasters.
	#[serde(alias = "includeSrcset")]
	pub include_srcset: bool,
	/// Sources ending with any of these suffixes are left untouched.
	#[serde(alias = "skipImages")]
	pub skip_images: Vec<String>,
	/// Overrides the generated default `sizes` expression.
	pub sizes: Option<String>,
	/// The baseline classes merged into every rewritten element.
	pub classes: Vec<String>,
	/// Settings for running over a project directory.
	pub project: ProjectConfig,
}

impl Default for EnhanceConfig {
	fn default() -> Self {
		Self {
			widths: DEFAULT_WIDTHS.to_vec(),
			main_width: DEFAULT_MAIN_WIDTH,
			include_metadata: true,
			include_srcset: true,
			skip_images: vec![],
			sizes: None,
			classes: vec![DEFAULT_CLASS.to_string()],
			project: ProjectConfig::default(),
		}
	}
}

/// Which files a project run should touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
	/// File extensions, without the dot, treated as markup documents.
	pub extensions: Vec<String>,
	/// Gitignore-style patterns for files and directories to skip. These are
	/// relative to the project root.
	pub exclude: Vec<String>,
	/// When true, `.gitignore` files are not used for filtering.
	pub disable_gitignore: bool,
}

impl Default for ProjectConfig {
	fn default() -> Self {
		Self {
			extensions: vec!["svelte".into(), "svx".into(), "md".into()],
			exclude: vec![],
			disable_gitignore: false,
		}
	}
}

impl EnhanceConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> EnhanceResult<Option<EnhanceConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;

		Ok(Some(config))
	}

	/// Load the config at `root`, falling back to the defaults.
	pub fn load_or_default(root: &Path) -> EnhanceResult<EnhanceConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse and validate a config from TOML text.
	pub fn from_toml(content: &str) -> EnhanceResult<EnhanceConfig> {
		let config: EnhanceConfig =
			toml::from_str(content).map_err(|e| EnhanceError::ConfigParse(e.to_string()))?;
		config.validate()?;

		Ok(config)
	}

	/// Check that every width is positive.
	pub fn validate(&self) -> EnhanceResult<()> {
		self.width_set().map(|_| ())
	}

	/// The sorted, deduplicated union of `widths` and `main_width`.
	pub fn width_set(&self) -> EnhanceResult<WidthSet> {
		WidthSet::new(&self.widths, self.main_width)
	}

	/// The `sizes` value used when the author did not supply one.
	pub fn default_sizes(&self) -> String {
		self.sizes.clone().unwrap_or_else(|| {
			format!(
				"(min-width: {width}px) {width}px, 100vw",
				width = self.main_width
			)
		})
	}

	/// Whether `url` matches one of the `skip_images` suffixes.
	pub fn is_skipped(&self, url: &str) -> bool {
		self.skip_images
			.iter()
			.any(|suffix| !suffix.is_empty() && url.ends_with(suffix.as_str()))
	}
}
