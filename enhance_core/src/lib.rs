//! `enhance_core` is the core library for the [enhance](https://github.com/ifiokjr/enhance) media preprocessor. It rewrites raw `<img>` and `<video>` references in Svelte components, mdsvex documents and rendered markdown into responsive, bundler-aware markup, and adds the asset imports the new markup depends on.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Markup document
//!   → Scanner (logos tokens → elements with byte offsets, scripts with their imports)
//!   → Classifier (external / video / gif / passthrough / transformable raster)
//!   → Planner (one derived-asset plan per distinct URL, bindings from the binding table)
//!   → Rewriter (in place, <picture> block, or <video> with a <source>)
//!   → Import emitter (new declarations appended to the instance script)
//!   → Edit list (validated, non-overlapping, applied once)
//! ```
//!
//! Nothing is decoded or resized here. Derived images are described by import
//! specifiers whose query (`?w=480;768&format=avif&as=srcset`,
//! `?as=meta:width;height`) the bundler's asset pipeline understands.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `enhance.toml`: widths, main width, metadata and srcset switches, skipped images, baseline classes and project file selection.
//! - [`project`]: Project scanning and directory walking. Finds markup files and computes per-file results.
//!
//! ## Key Types
//!
//! - [`Document`]: The template AST: elements with spans and attributes, and script blocks with their imports.
//! - [`AssetReference`]: A normalized media source and its [`AssetKind`].
//! - [`DerivedAssetPlan`]: The imports planned for one asset.
//! - [`BindingTable`]: Specifier to local binding map, seeded from the document's own imports.
//! - [`EditList`]: Offset-addressed edits applied in one pass.
//! - [`EnhanceOutput`]: Patched code plus the emitted imports, plans and skipped elements.
//!
//! ## Quick Start
//!
//! ```rust
//! use enhance_core::EnhanceConfig;
//! use enhance_core::enhance_source;
//!
//! let config = EnhanceConfig::default();
//! let output = enhance_source(r#"<img src="./cat.gif" alt="cat">"#, &config).unwrap();
//!
//! assert!(output.code.starts_with("<script>\nimport __media_cat_gif from \"./cat.gif\";"));
//! assert!(output.code.contains("src={__media_cat_gif}"));
//! ```

pub use attributes::*;
pub use classify::*;
pub use config::*;
pub use document::*;
pub use edits::*;
pub use engine::*;
pub use error::*;
pub use imports::*;
pub use parser::*;
pub use plan::*;
pub use position::*;
pub use project::*;
pub use rewrite::SkipReason;

mod attributes;
mod classify;
pub mod config;
mod document;
mod edits;
mod engine;
#[allow(unused_assignments)]
mod error;
mod imports;
pub(crate) mod lexer;
mod parser;
mod plan;
mod position;
pub mod project;
mod rewrite;
pub(crate) mod script;

#[cfg(test)]
mod __tests;
