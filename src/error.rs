use crate::template::TemplateError;
use thiserror::Error;

/// Any failure surfaced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error(transparent)]
	Template(#[from] TemplateError),

	#[error("Unknown directive type: {0}")]
	UnknownDirective(String),

	/// [`Directive::set_model`](`crate::Directive::set_model`) found no form field with this name.
	#[error("no form field named {0:?}")]
	MissingField(String),

	#[error("invalid selector: {0:?}")]
	Selector(String),
}
