//! Directive type registration and linking.

use crate::{
	diff::ISOLATE_CLASS,
	directive::{Directive, DIRECTIVE_TAG, EVENT_TYPES, INITIALISED_CLASS},
	dom::{self, Node, Selector},
	template::{TemplateError, Templates},
	Error, Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{instrument, trace, warn};

/// Renders a template source against data.
pub type Renderer = Rc<dyn Fn(&str, &Value) -> Result<String, TemplateError>>;

/// Runs when a linked directive element leaves its document.
pub type Unlink = Box<dyn FnOnce()>;

type LinkFn = Rc<dyn Fn(&Directive, &Node) -> Result<Option<Unlink>, Error>>;

/// A tree that directive markers can be discovered in.
pub trait Scope {
	/// Matching elements in document order.
	fn select_all(&self, selector: &Selector) -> Vec<Node>;
}

impl Scope for Node {
	fn select_all(&self, selector: &Selector) -> Vec<Node> {
		Node::select_all(self, selector)
	}
}

pub struct Config {
	/// Exposes each linked [`Directive`] on its element until the element leaves its document, see [`Directive::of`].
	pub debug: bool,
	/// Replaces the built-in [`template`](`crate::template`) renderer.
	pub renderer: Option<Renderer>,
	/// Native event types that `data-on<type>` aliases are recognised for.
	pub events: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			debug: false,
			renderer: None,
			events: EVENT_TYPES.iter().map(|&e| e.to_owned()).collect(),
		}
	}
}

impl Debug for Config {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("debug", &self.debug)
			.field("renderer", &self.renderer.as_ref().map(|_| "custom"))
			.field("events", &self.events)
			.finish()
	}
}

struct DirectiveType {
	template: String,
	link: LinkFn,
}

struct RegistryInner {
	config: Config,
	templates: Templates,
	types: RefCell<HashMap<String, Rc<DirectiveType>>>,
}

/// Maps directive type names to their template and link function.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct Registry(Rc<RegistryInner>);

impl Debug for Registry {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut types: Vec<String> = self.0.types.borrow().keys().cloned().collect();
		types.sort();
		f.debug_struct("Registry").field("config", &self.0.config).field("types", &types).finish()
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl Registry {
	#[must_use]
	pub fn new() -> Self {
		Self::with_config(Config::default())
	}

	#[must_use]
	pub fn with_config(config: Config) -> Self {
		Self(Rc::new(RegistryInner {
			config,
			templates: Templates::new(),
			types: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.0.config
	}

	pub(crate) fn events(&self) -> &[String] {
		&self.0.config.events
	}

	/// Registers (or replaces) the directive type `type_name`.
	///
	/// When an element is linked as this type, `link` runs with the new [`Directive`] and the element.
	/// The [`Unlink`] it may return runs once after the element left its document.
	pub fn register_directive(
		&self,
		type_name: &str,
		template: &str,
		link: impl Fn(&Directive, &Node) -> Result<Option<Unlink>, Error> + 'static,
	) -> &Self {
		trace!(type_name, "Registering directive type.");
		let directive_type = Rc::new(DirectiveType {
			template: template.to_owned(),
			link: Rc::new(link),
		});
		self.0.types.borrow_mut().insert(type_name.to_owned(), directive_type);
		self
	}

	/// Runs `module` with this registry, usually to register a group of directive types.
	pub fn register_module(&self, module: impl FnOnce(&Registry)) -> &Self {
		module(self);
		self
	}

	#[must_use]
	pub fn has_directive(&self, type_name: &str) -> bool {
		self.0.types.borrow().contains_key(type_name)
	}

	/// Renders `template` through the configured renderer.
	///
	/// # Errors
	///
	/// Iff the template is malformed.
	pub fn render(&self, template: &str, data: &Value) -> Result<String, TemplateError> {
		match &self.0.config.renderer {
			Some(renderer) => renderer(template, data),
			None => self.0.templates.render(template, data),
		}
	}

	/// Links `element` as directive of type `type_name`, or of its `type` attribute if [`None`].
	///
	/// The element's content is cleared before the type's link function runs.
	/// Afterwards it carries the classes `muu-isolate` and `muu-initialised`.
	///
	/// # Errors
	///
	/// [`Error::UnknownDirective`] if the type isn't registered, otherwise any error returned by the link function.
	#[instrument(skip(self, element))]
	pub fn link(&self, element: &Node, type_name: Option<&str>) -> Result<Directive, Error> {
		let type_name = match type_name {
			Some(type_name) => type_name.to_owned(),
			None => element.attribute("type").unwrap_or_default(),
		};
		let directive_type = self
			.0
			.types
			.borrow()
			.get(&type_name)
			.cloned()
			.ok_or_else(|| Error::UnknownDirective(type_name.clone()))?;

		let directive = Directive::new(element.clone(), directive_type.template.clone(), self.clone());
		let unlink = (directive_type.link)(&directive, element)?;

		element.add_class(ISOLATE_CLASS);
		element.add_class(INITIALISED_CLASS);

		if self.0.config.debug {
			element.set_expando(Rc::new(directive.clone()));
			let weak = element.downgrade();
			let release = move || {
				if let Some(element) = weak.upgrade() {
					drop(element.take_expando());
				}
			};
			if dom::destroy(element, release).is_none() {
				drop(element.take_expando());
				warn!("<{}> has no owner document. The directive is not exposed on it.", element.node_name());
			}
		}

		if let Some(unlink) = unlink {
			if dom::destroy(element, unlink).is_none() {
				warn!("<{}> has no owner document. Its unlink function will never run.", element.node_name());
			}
		}

		trace!("Linked.");
		Ok(directive)
	}

	/// Links all not yet initialised directive markers in `scope`, in document order.
	///
	/// # Errors
	///
	/// Stops at the first marker that fails to link. Markers linked before stay linked.
	#[instrument(skip(self, scope))]
	pub fn link_all<S: Scope + ?Sized>(&self, scope: &S) -> Result<Vec<Directive>, Error> {
		let selector = Selector::parse(&format!("{}:not(.{})", DIRECTIVE_TAG, INITIALISED_CLASS))?;
		let mut linked = Vec::new();
		for element in scope.select_all(&selector) {
			// Linking an outer marker may have replaced or linked this one already.
			if element.has_class(INITIALISED_CLASS) {
				continue;
			}
			linked.push(self.link(&element, None)?);
		}
		Ok(linked)
	}
}
