//! Minimal mustache-inspired templating.
//!
//! # Variables
//!
//! `{{name}}` is replaced by the HTML-escaped value of `name` in the current context.
//! Falsy values render as the empty string, apart from the number `0`.
//!
//! # Loops
//!
//! `{{#items}}…{{/items}}` renders the block once per element if `items` is a sequence,
//! with that element as the block's context.
//! For any other truthy value the block is rendered once with the *outer* context.
//!
//! # Inverted loops
//!
//! `{{^flag}}…{{/flag}}` renders the block once with the outer context iff `flag` is falsy.
//!
//! # Comments
//!
//! `{{!anything}}` renders nothing.
//!
//! # Pairs
//!
//! `{{foo: var1, bar: var2}}` renders the space-separated labels whose key is truthy:
//!
//! ```
//! use muu_dom::{template, Value};
//!
//! let data = Value::map(vec![("var1", true), ("var2", false), ("var3", true)]);
//! let html = template::render("{{foo: var1, bar: var2, baz: var3}}", &data).unwrap();
//! assert_eq!(html, "foo baz");
//! ```
//!
//! # `this`
//!
//! `this` always refers to the current context, so templates can iterate raw sequences:
//!
//! ```
//! use muu_dom::{template, Value};
//!
//! let data = Value::from(vec![1, 2]);
//! assert_eq!(template::render("{{#this}}{{this}}{{/this}}", &data).unwrap(), "12");
//! ```

use crate::value::Value;
use core::cell::RefCell;
use hashbrown::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{instrument, trace};

const OPEN_TAG: &str = "{{";
const CLOSE_TAG: &str = "}}";

/// Parse-time template failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
	/// A `{{` without matching `}}`. Carries the remainder of the template starting at the open tag.
	#[error("unclosed tag: {0}")]
	UnclosedTag(String),
	/// End of input inside `{{#name}}` or `{{^name}}`.
	#[error("unclosed loop: {0}")]
	UnclosedLoop(String),
	/// `{{/name}}` that doesn't close the innermost open loop.
	#[error("unexpected closing loop: {0}")]
	UnexpectedClosingLoop(String),
}

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	Literal(String),
	Variable(String),
	/// `(label, key)` in declaration order.
	Pairs(Vec<(String, String)>),
	Section {
		name: String,
		inverted: bool,
		body: Vec<Segment>,
	},
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	segments: Vec<Segment>,
}

impl Template {
	/// Parses `source` without consulting any cache.
	///
	/// # Errors
	///
	/// Iff `source` is malformed.
	pub fn parse(source: &str) -> Result<Self, TemplateError> {
		let mut parser = Parser { rest: source };
		let segments = parser.parse_block(None)?;
		debug_assert!(parser.rest.is_empty());
		Ok(Self { segments })
	}

	#[must_use]
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	#[must_use]
	pub fn render(&self, data: &Value) -> String {
		let mut out = String::new();
		render_segments(&self.segments, data, &mut out);
		out
	}
}

struct Parser<'a> {
	rest: &'a str,
}

impl<'a> Parser<'a> {
	/// Parses until end of input (`loop_name == None`) or until the close tag of `loop_name`.
	fn parse_block(&mut self, loop_name: Option<&str>) -> Result<Vec<Segment>, TemplateError> {
		let mut segments = Vec::new();
		loop {
			let rest: &'a str = self.rest;
			let open = match rest.find(OPEN_TAG) {
				Some(open) => open,
				None => {
					if let Some(name) = loop_name {
						return Err(TemplateError::UnclosedLoop(name.to_owned()));
					}
					if !rest.is_empty() {
						segments.push(Segment::Literal(rest.to_owned()));
					}
					self.rest = "";
					return Ok(segments);
				}
			};

			if open > 0 {
				segments.push(Segment::Literal(rest[..open].to_owned()));
			}
			let tag_start = &rest[open..];
			let close = tag_start.find(CLOSE_TAG).ok_or_else(|| TemplateError::UnclosedTag(tag_start.to_owned()))?;
			let tag = &tag_start[OPEN_TAG.len()..close];
			self.rest = &tag_start[close + CLOSE_TAG.len()..];

			if let Some(name) = tag.strip_prefix('#') {
				let body = self.parse_block(Some(name))?;
				segments.push(Segment::Section { name: name.to_owned(), inverted: false, body });
			} else if let Some(name) = tag.strip_prefix('^') {
				let body = self.parse_block(Some(name))?;
				segments.push(Segment::Section { name: name.to_owned(), inverted: true, body });
			} else if tag.starts_with('!') {
				// Comment.
			} else if let Some(name) = tag.strip_prefix('/') {
				return if loop_name == Some(name) {
					Ok(segments)
				} else {
					Err(TemplateError::UnexpectedClosingLoop(name.to_owned()))
				};
			} else if tag.contains(':') {
				segments.push(Segment::Pairs(parse_pairs(tag)));
			} else {
				segments.push(Segment::Variable(tag.to_owned()));
			}
		}
	}
}

fn parse_pairs(tag: &str) -> Vec<(String, String)> {
	tag.split(',')
		.map(|pair| match pair.find(':') {
			Some(colon) => (pair[..colon].trim().to_owned(), pair[colon + 1..].trim().to_owned()),
			None => (pair.trim().to_owned(), String::new()),
		})
		.collect()
}

fn render_segments(segments: &[Segment], data: &Value, out: &mut String) {
	for segment in segments {
		match segment {
			Segment::Literal(text) => out.push_str(text),
			Segment::Variable(name) => {
				if let Some(value) = data.lookup(name) {
					out.push_str(&escape_html(&value.to_variable_text()));
				}
			}
			Segment::Pairs(pairs) => {
				let labels: Vec<&str> = pairs
					.iter()
					.filter(|(_, key)| data.lookup(key).map_or(false, Value::is_truthy))
					.map(|(label, _)| label.as_str())
					.collect();
				out.push_str(&escape_html(&labels.join(" ")));
			}
			Segment::Section { name, inverted, body } => {
				let value = data.lookup(name);
				let truthy = value.map_or(false, Value::is_truthy);
				if *inverted {
					if !truthy {
						render_segments(body, data, out);
					}
				} else if let Some(items) = value.and_then(Value::as_list) {
					for item in items {
						render_segments(body, item, out);
					}
				} else if truthy {
					render_segments(body, data, out);
				}
			}
		}
	}
}

/// Replaces each of `& < > " ' /` with its entity in a single pass.
#[must_use]
pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			'/' => escaped.push_str("&#x2F;"),
			c => escaped.push(c),
		}
	}
	escaped
}

/// A compilation cache keyed by template source.
///
/// Entries are never evicted. Failed compilations are not cached.
#[derive(Debug, Default)]
pub struct Templates {
	compiled: RefCell<HashMap<String, Rc<Template>>>,
}

impl Templates {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Compiles `source`, or returns the cached compilation of an identical source.
	///
	/// # Errors
	///
	/// Iff `source` is malformed.
	#[instrument(skip(self, source), fields(len = source.len()))]
	pub fn compile(&self, source: &str) -> Result<Rc<Template>, TemplateError> {
		if let Some(template) = self.compiled.borrow().get(source) {
			return Ok(Rc::clone(template));
		}
		let template = Rc::new(Template::parse(source)?);
		trace!("Compiled template with {} top-level segment(s).", template.segments.len());
		self.compiled.borrow_mut().insert(source.to_owned(), Rc::clone(&template));
		Ok(template)
	}

	/// # Errors
	///
	/// Iff `source` is malformed.
	pub fn render(&self, source: &str, data: &Value) -> Result<String, TemplateError> {
		Ok(self.compile(source)?.render(data))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.compiled.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.compiled.borrow().is_empty()
	}
}

thread_local! {
	static TEMPLATES: Templates = Templates::new();
}

/// Compiles `source` through the thread's shared cache.
///
/// # Errors
///
/// Iff `source` is malformed.
pub fn compile(source: &str) -> Result<Rc<Template>, TemplateError> {
	TEMPLATES.with(|templates| templates.compile(source))
}

/// Renders `source` against `data` through the thread's shared cache.
///
/// # Errors
///
/// Iff `source` is malformed.
pub fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
	TEMPLATES.with(|templates| templates.render(source, data))
}
