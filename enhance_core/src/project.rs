use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::EnhanceConfig;
use crate::EnhanceError;
use crate::EnhanceResult;
use crate::ImportBinding;
use crate::ProjectConfig;
use crate::EnhanceOutput;
use crate::SkippedElement;
use crate::Syntax;
use crate::config::CONFIG_FILE_CANDIDATES;
use crate::enhance_source_with;

/// What happened to one markup file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
	pub file: PathBuf,
	/// Whether the file content would change.
	pub changed: bool,
	pub rewritten: usize,
	pub imports: Vec<ImportBinding>,
	pub skipped: Vec<SkippedElement>,
}

/// A file that could not be enhanced. Collected rather than aborting so that
/// a run reports every problem at once.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
	pub file: PathBuf,
	pub message: String,
}

/// Result of enhancing a project.
#[derive(Debug, Default, Serialize)]
pub struct UpdateResult {
	/// Files that would change and their new content.
	#[serde(skip)]
	pub updated_files: BTreeMap<PathBuf, String>,
	/// One report per scanned file, in path order.
	pub reports: Vec<FileReport>,
	pub errors: Vec<FileError>,
}

impl UpdateResult {
	/// Returns true if no file would change and nothing failed.
	pub fn is_ok(&self) -> bool {
		self.updated_files.is_empty() && self.errors.is_empty()
	}

	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}

	pub fn changed_count(&self) -> usize {
		self.updated_files.len()
	}

	/// Total number of rewritten elements across all files.
	pub fn rewritten_count(&self) -> usize {
		self.reports.iter().map(|report| report.rewritten).sum()
	}
}

/// Enhance every markup file under `root` without writing anything.
pub fn compute_updates(root: &Path, config: &EnhanceConfig) -> EnhanceResult<UpdateResult> {
	config.validate()?;

	let files = collect_files(root, &config.project)?;
	let mut result = UpdateResult::default();

	tracing::debug!(root = %root.display(), files = files.len(), "scanning project");

	for file in files {
		match enhance_file(&file, config) {
			Ok((original, output)) => {
				let changed = output.is_changed(&original);
				result.reports.push(FileReport {
					file: file.clone(),
					changed,
					rewritten: output.rewritten,
					imports: output.imports,
					skipped: output.skipped,
				});

				if changed {
					result.updated_files.insert(file, output.code);
				}
			}
			Err(error) => {
				tracing::warn!(file = %file.display(), %error, "failed to enhance file");
				result.errors.push(FileError {
					file,
					message: error.to_string(),
				});
			}
		}
	}

	Ok(result)
}

/// Read and enhance one file. Markdown files are scanned as markdown.
fn enhance_file(file: &Path, config: &EnhanceConfig) -> EnhanceResult<(String, EnhanceOutput)> {
	let original = std::fs::read_to_string(file)?;
	let output = enhance_source_with(&original, Syntax::from_path(file), config)?;

	Ok((original, output))
}

/// Write the updated contents back to disk.
pub fn write_updates(updates: &UpdateResult) -> EnhanceResult<()> {
	for (path, content) in &updates.updated_files {
		std::fs::write(path, content)?;
	}
	Ok(())
}

/// Collect every markup file under `root` with one of the configured
/// extensions.
///
/// Files matched by the project's `.gitignore` are skipped unless
/// `disable_gitignore` is set. The configured `exclude` patterns follow
/// gitignore syntax and are always applied on top.
pub fn collect_files(root: &Path, project: &ProjectConfig) -> EnhanceResult<Vec<PathBuf>> {
	let extensions = build_extension_set(&project.extensions)?;
	let gitignore = if project.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let exclude = build_exclude_matcher(root, &project.exclude)?;

	let mut walker = Walker {
		extensions: &extensions,
		gitignore: &gitignore,
		exclude: &exclude,
		visited_dirs: HashSet::new(),
		files: vec![],
	};
	walker.walk(root, true)?;

	let mut files = walker.files;
	files.sort();
	Ok(files)
}

struct Walker<'a> {
	extensions: &'a GlobSet,
	gitignore: &'a Gitignore,
	exclude: &'a Gitignore,
	visited_dirs: HashSet<PathBuf>,
	files: Vec<PathBuf>,
}

impl Walker<'_> {
	fn walk(&mut self, dir: &Path, is_root: bool) -> EnhanceResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		// Symlinked directories can loop back on themselves.
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !self.visited_dirs.insert(canonical) {
			tracing::trace!(dir = %dir.display(), "skipping visited directory");
			return Ok(());
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if path
				.file_name()
				.and_then(|name| name.to_str())
				.is_some_and(is_ignored_directory_name)
			{
				continue;
			}

			let is_dir = path.is_dir();

			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				// A nested config marks a separate project.
				if !is_root && has_project_config(&path) {
					continue;
				}
				self.walk(&path, false)?;
			} else if path
				.file_name()
				.is_some_and(|name| self.extensions.is_match(name))
			{
				self.files.push(path);
			}
		}

		Ok(())
	}
}

fn build_extension_set(extensions: &[String]) -> EnhanceResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();

	for extension in extensions {
		let pattern = format!("*.{}", extension.trim_start_matches('.'));
		let glob = Glob::new(&pattern).map_err(|e| {
			EnhanceError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map_err(|e| {
		EnhanceError::InvalidPattern {
			pattern: extensions.join(", "),
			reason: e.to_string(),
		}
	})
}

/// Build a `Gitignore` matcher from the `[project] exclude` patterns.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> EnhanceResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			EnhanceError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		EnhanceError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		if let Some(error) = builder.add(&gitignore_path) {
			tracing::warn!(path = %gitignore_path.display(), %error, "ignoring invalid .gitignore");
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn has_project_config(dir: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| dir.join(candidate).is_file())
}
