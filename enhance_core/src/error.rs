use miette::Diagnostic;
use thiserror::Error;

use crate::Span;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum EnhanceError {
	#[error(transparent)]
	#[diagnostic(code(enhance::io_error))]
	Io(#[from] std::io::Error),

	#[error("unclosed `<{tag}>` element starting at byte {offset}")]
	#[diagnostic(
		code(enhance::unclosed_raw_text),
		help("add a matching `</{tag}>` closing tag")
	)]
	UnclosedRawText { tag: String, offset: usize },

	#[error("overlapping edits at {first:?} and {second:?}")]
	#[diagnostic(
		code(enhance::overlapping_edits),
		help("this is a bug in enhance, please report it with the document that triggered it")
	)]
	OverlappingEdits { first: Span, second: Span },

	#[error("edit range {0:?} is outside the document")]
	#[diagnostic(code(enhance::edit_out_of_bounds))]
	EditOutOfBounds(Span),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(enhance::config_parse),
		help("check that enhance.toml is valid TOML with the documented keys")
	)]
	ConfigParse(String),

	#[error("invalid width `{0}`")]
	#[diagnostic(
		code(enhance::invalid_width),
		help("`widths` and `main_width` must be positive integers")
	)]
	InvalidWidth(u32),

	#[error("invalid pattern `{pattern}`: {reason}")]
	#[diagnostic(code(enhance::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },
}

pub type EnhanceResult<T> = Result<T, EnhanceError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
