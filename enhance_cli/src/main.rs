use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use enhance_cli::Commands;
use enhance_cli::EnhanceCli;
use enhance_cli::OutputFormat;
use enhance_core::EnhanceConfig;
use enhance_core::Syntax;
use enhance_core::UpdateResult;
use enhance_core::compute_updates;
use enhance_core::enhance_source_with;
use enhance_core::write_updates;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = r#"# enhance configuration

# Extra srcset widths. `main_width` is always added.
widths = [480, 768, 1024]

# The primary display width, used for the default `sizes` expression.
main_width = 1280

# Import `{ width, height }` metadata to fill in missing dimensions.
include_metadata = true

# Sources ending with any of these suffixes are left alone.
skip_images = []

# Classes merged into every rewritten element.
classes = ["enhanced-media"]

[project]
extensions = ["svelte", "svx", "md"]
exclude = []
"#;

fn main() {
	let args = EnhanceCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args).map(|()| false),
		Some(Commands::Run { dry_run, diff }) => run_enhance(&args, *dry_run, *diff).map(|()| false),
		Some(Commands::Check { diff, format }) => run_check(&args, *diff, *format),
		Some(Commands::Inspect { file, format }) => run_inspect(&args, file, *format).map(|()| false),
		None => {
			eprintln!("No subcommand specified. Run `enhance --help` for usage.");
			process::exit(1);
		}
	};

	match result {
		Ok(true) => process::exit(1),
		Ok(false) => {}
		Err(e) => {
			// Try to render through miette for rich diagnostics with help text
			// and error codes.
			match e.downcast::<enhance_core::EnhanceError>() {
				Ok(enhance_err) => {
					let report: miette::Report = (*enhance_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "enhance_core=debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &EnhanceCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(root: &Path) -> Result<EnhanceConfig, Box<dyn std::error::Error>> {
	if let Some(path) = EnhanceConfig::resolve_path(root) {
		tracing::debug!(path = %path.display(), "loading config");
	}

	Ok(EnhanceConfig::load_or_default(root)?)
}

fn run_init(args: &EnhanceCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = EnhanceConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("enhance.toml");
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Adjust the widths and classes in enhance.toml");
	println!("  2. Run `enhance run --dry-run --diff` to preview the changes");
	println!("  3. Run `enhance run` to rewrite your media elements");

	Ok(())
}

fn compute_project(args: &EnhanceCli) -> Result<(PathBuf, UpdateResult), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let updates = compute_updates(&root, &config)?;

	if updates.has_errors() {
		for error in &updates.errors {
			eprintln!(
				"{} {}: {}",
				colored!("error:", red),
				make_relative(&error.file, &root),
				error.message
			);
		}
	}

	Ok((root, updates))
}

fn run_enhance(args: &EnhanceCli, dry_run: bool, diff: bool) -> Result<(), Box<dyn std::error::Error>> {
	let (root, updates) = compute_project(args)?;

	if updates.changed_count() == 0 {
		println!("All media elements are already enhanced.");
	} else if dry_run {
		println!(
			"Dry run: would rewrite {} element(s) in {} file(s):",
			updates.rewritten_count(),
			updates.changed_count()
		);
		for (path, content) in &updates.updated_files {
			println!("  {}", make_relative(path, &root));

			if diff {
				let current = std::fs::read_to_string(path)?;
				print_diff(&current, content);
			}
		}
	} else {
		write_updates(&updates)?;
		println!(
			"Rewrote {} element(s) in {} file(s).",
			updates.rewritten_count(),
			updates.changed_count()
		);

		if args.verbose {
			for path in updates.updated_files.keys() {
				println!("  {}", make_relative(path, &root));
			}
		}
	}

	if updates.has_errors() {
		return Err(format!("{} file(s) could not be enhanced", updates.errors.len()).into());
	}

	Ok(())
}

/// Returns `Ok(true)` when files would change.
fn run_check(
	args: &EnhanceCli,
	show_diff: bool,
	format: OutputFormat,
) -> Result<bool, Box<dyn std::error::Error>> {
	let (root, updates) = compute_project(args)?;

	if updates.is_ok() {
		match format {
			OutputFormat::Json => println!("{{\"ok\":true,\"changed\":[],\"errors\":[]}}"),
			OutputFormat::Text => println!("Check passed: all media elements are enhanced."),
		}
		return Ok(false);
	}

	match format {
		OutputFormat::Json => {
			let changed: Vec<serde_json::Value> = updates
				.reports
				.iter()
				.filter(|report| report.changed)
				.map(|report| {
					serde_json::json!({
						"file": make_relative(&report.file, &root),
						"rewritten": report.rewritten,
						"imports": report.imports,
					})
				})
				.collect();
			let errors: Vec<serde_json::Value> = updates
				.errors
				.iter()
				.map(|error| {
					serde_json::json!({
						"file": make_relative(&error.file, &root),
						"message": error.message,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"changed": changed,
				"errors": errors,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!("  files to rewrite: {}", updates.changed_count());
			eprintln!("  elements to rewrite: {}", updates.rewritten_count());

			if updates.changed_count() > 0 {
				eprintln!();
				eprintln!("Files:");
				for (path, content) in &updates.updated_files {
					eprintln!("  {}", make_relative(path, &root));

					if show_diff {
						let current = std::fs::read_to_string(path)?;
						print_diff(&current, content);
					}
				}
			}

			eprintln!();
			eprintln!(
				"{}",
				colored!("Run `enhance run` to rewrite these files.", yellow)
			);
		}
	}

	if updates.has_errors() && updates.changed_count() == 0 {
		return Err(format!("{} file(s) could not be enhanced", updates.errors.len()).into());
	}

	Ok(true)
}

fn run_inspect(
	args: &EnhanceCli,
	file: &Path,
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let path = root.join(file);
	let source = std::fs::read_to_string(&path)?;
	let output = enhance_source_with(&source, Syntax::from_path(&path), &config)?;

	if let OutputFormat::Json = format {
		println!("{}", serde_json::to_string_pretty(&output)?);
		return Ok(());
	}

	println!("{}", colored!(make_relative(&path, &root), bold));
	match EnhanceConfig::resolve_path(&root) {
		Some(config_path) => println!("Resolved config: {}", config_path.display()),
		None => println!("Resolved config: defaults"),
	}
	println!("Rewritten elements: {}", output.rewritten);

	if !output.imports.is_empty() {
		println!();
		println!("{}", colored!("Imports:", bold));
		for import in &output.imports {
			println!("  {} from \"{}\"", import.binding, import.specifier);
		}
	}

	if !output.skipped.is_empty() {
		println!();
		println!("{}", colored!("Skipped:", bold));
		for skipped in &output.skipped {
			println!(
				"  <{}> at {}:{}: {}",
				skipped.name, skipped.point.line, skipped.point.column, skipped.reason
			);
		}
	}

	if output.is_changed(&source) && args.verbose {
		println!();
		print_diff(&source, &output.code);
	}

	Ok(())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
	if !expected.ends_with('\n') {
		eprintln!();
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
