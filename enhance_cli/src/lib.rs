use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Rewrite raw <img> and <video> tags into responsive, bundler-aware markup.",
	long_about = "enhance rewrites the media elements in Svelte components, mdsvex documents and \
	              rendered markdown into optimized markup.\n\nTransformable images become a \
	              <picture> with AVIF and WebP srcsets, GIF and SVG sources are imported as they \
	              are, and videos get a <source> child. The asset imports the new markup needs \
	              are added to the component script.\n\nQuick start:\n  enhance init     \
	              Create an enhance.toml\n  enhance run      Rewrite every markup file\n  \
	              enhance check    Verify nothing is left to rewrite\n  enhance inspect  Show \
	              what would happen to one file"
)]
pub struct EnhanceCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize enhance in a project by creating a sample `enhance.toml`.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Rewrite the media elements of every markup file in the project.
	///
	/// Files are selected by the `[project]` section of `enhance.toml`. Use
	/// `--dry-run` to preview which files would change without writing them.
	Run {
		/// Preview changes without writing files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// With `--dry-run`, show a unified diff for every file that would
		/// change.
		#[arg(long, default_value_t = false, requires = "dry_run")]
		diff: bool,
	},
	/// Check that every markup file is already enhanced.
	///
	/// Exits with status 1 if any file would change. Ideal for CI pipelines.
	Check {
		/// Show a unified diff for each file that would change.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Show the imports, plans and skipped elements for one file without
	/// changing it.
	Inspect {
		/// The markup file to inspect, relative to the project root.
		file: PathBuf,

		/// Output format. `json` includes the patched code.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
