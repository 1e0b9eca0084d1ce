use percent_encoding::percent_decode_str;
use serde::Serialize;

/// Schemes that can never be imported as a module.
const EXTERNAL_SCHEMES: [&str; 7] = [
	"http:",
	"https:",
	"data:",
	"blob:",
	"mailto:",
	"tel:",
	"javascript:",
];

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];
const PASSTHROUGH_EXTENSIONS: [&str; 3] = ["svg", "webp", "avif"];

/// How a media source should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
	/// Absolute or non-fetchable URL. Never rewritten.
	External,
	Video,
	/// GIF. Modern encodings would break the animation, so only the original
	/// is imported.
	AnimatedRaster,
	/// Already optimal formats (SVG, WebP, AVIF).
	PassthroughFormat,
	/// Everything else gets responsive variants.
	TransformableRaster,
}

/// A normalized media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
	/// The decoded URL with any fragment removed. The query string is kept so
	/// that it reaches the asset pipeline.
	pub url: String,
	/// `url` without its query string.
	pub path: String,
	/// Lowercase extension of `path`, without the dot.
	pub extension: String,
	pub kind: AssetKind,
}

impl AssetReference {
	/// Classify a raw `src` attribute value. Returns `None` for an empty
	/// source, which has nothing to rewrite.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return None;
		}

		let decoded = decode(trimmed);
		let without_fragment = decoded.split('#').next().unwrap_or_default();
		if without_fragment.is_empty() {
			return None;
		}

		let url = normalize_relative(without_fragment);
		let path = url.split('?').next().unwrap_or_default().to_string();
		let extension = extension_of(&path);
		let kind = if is_external(&url) {
			AssetKind::External
		} else {
			kind_for_extension(&extension)
		};

		Some(Self {
			url,
			path,
			extension,
			kind,
		})
	}

	pub fn is_external(&self) -> bool {
		self.kind == AssetKind::External
	}

	/// The MIME type of a video source, when recognizable.
	pub fn video_mime_type(&self) -> Option<&'static str> {
		match self.extension.as_str() {
			"mp4" => Some("video/mp4"),
			"webm" => Some("video/webm"),
			"ogg" => Some("video/ogg"),
			_ => None,
		}
	}
}

/// Percent-decode `raw`, falling back to the raw text when the result is not
/// valid UTF-8.
pub fn decode(raw: &str) -> String {
	percent_decode_str(raw)
		.decode_utf8()
		.map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned())
}

/// Whether `url` points outside the project: protocol relative, a known
/// external scheme, or any other `scheme:` prefix.
pub fn is_external(url: &str) -> bool {
	if url.starts_with("//") {
		return true;
	}

	let lowercase = url.to_ascii_lowercase();
	if EXTERNAL_SCHEMES
		.iter()
		.any(|scheme| lowercase.starts_with(scheme))
	{
		return true;
	}

	has_scheme(url)
}

/// RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`, before any
/// `/`, `?` or `#`.
fn has_scheme(url: &str) -> bool {
	let Some(colon) = url.find(':') else {
		return false;
	};

	let scheme = &url[..colon];
	let mut chars = scheme.chars();

	chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
		&& chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

/// `assets/a.png` becomes `./assets/a.png` so the bundler resolves it as a
/// relative module rather than a package.
fn normalize_relative(url: &str) -> String {
	if url == "assets" || url.starts_with("assets/") {
		format!("./{url}")
	} else {
		url.to_string()
	}
}

fn extension_of(path: &str) -> String {
	let file_name = path.rsplit('/').next().unwrap_or(path);

	file_name
		.rsplit_once('.')
		.map(|(_, extension)| extension.to_ascii_lowercase())
		.unwrap_or_default()
}

fn kind_for_extension(extension: &str) -> AssetKind {
	if VIDEO_EXTENSIONS.contains(&extension) {
		AssetKind::Video
	} else if extension == "gif" {
		AssetKind::AnimatedRaster
	} else if PASSTHROUGH_EXTENSIONS.contains(&extension) {
		AssetKind::PassthroughFormat
	} else {
		AssetKind::TransformableRaster
	}
}
