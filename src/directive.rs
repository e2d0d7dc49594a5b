//! A [`Directive`] is linked to an element and manages the tree below it, excluding isolated subtrees
//! (typically those managed by nested directives).
//!
//! Interaction happens in three ways:
//!
//! - Data is pushed to the tree with [`Directive::update`], which re-renders the directive's template.
//! - Form state is read and written with [`Directive::get_model`] and [`Directive::set_model`].
//! - Native events are aliased in markup: with `data-onclick="save"` on an element,
//!   a `click` on that element publishes `save` to every [`Directive::on`] subscriber.
//!
//! Directives are created through [`Registry::link`](`crate::Registry::link`).

use crate::{
	diff::{self, ISOLATE_CLASS},
	dom::{Event, Listener, Node, Selector},
	registry::{Registry, Scope},
	Error, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{instrument, trace};

/// Native event types that `data-on<type>` aliases are recognised for by default.
pub const EVENT_TYPES: &[&str] = &["keydown", "keyup", "click", "change", "search"];

/// Dispatched on already linked nested directive elements after each [`Directive::update`].
pub const PARENT_UPDATE_EVENT: &str = "muu-parent-update";

/// Tag name of directive markers.
pub const DIRECTIVE_TAG: &str = "muu";

/// Marks a directive marker that has been linked.
pub const INITIALISED_CLASS: &str = "muu-initialised";

type AliasCallback = Rc<dyn Fn(&Event)>;

/// Per-directive publish/subscribe channel from alias names to callbacks.
#[derive(Default)]
struct AliasChannel {
	subscriptions: RefCell<HashMap<String, Vec<(u64, AliasCallback)>>>,
	next_id: Cell<u64>,
}

impl AliasChannel {
	fn subscribe(&self, alias: &str, callback: AliasCallback) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.subscriptions.borrow_mut().entry(alias.to_owned()).or_default().push((id, callback));
		id
	}

	fn unsubscribe(&self, alias: &str, id: u64) {
		if let Some(callbacks) = self.subscriptions.borrow_mut().get_mut(alias) {
			callbacks.retain(|(i, _)| *i != id);
		}
	}

	fn publish(&self, alias: &str, event: &Event) {
		let callbacks: Vec<AliasCallback> = match self.subscriptions.borrow().get(alias) {
			Some(callbacks) => callbacks.iter().map(|(_, c)| Rc::clone(c)).collect(),
			None => return,
		};
		trace!(alias, subscribers = callbacks.len(), "Publishing alias.");
		for callback in callbacks {
			callback(event);
		}
	}
}

struct DirectiveInner {
	root: Node,
	template: String,
	registry: Registry,
	aliases: Rc<AliasChannel>,
	/// Shared by all aliased elements so re-attaching it is a no-op.
	dispatcher: Listener,
}

#[derive(Clone)]
pub struct Directive(Rc<DirectiveInner>);

impl Debug for Directive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Directive").field("root", &self.0.root).field("template.len()", &self.0.template.len()).finish()
	}
}

impl PartialEq for Directive {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Directive {
	/// Clears `root`'s existing content.
	pub(crate) fn new(root: Node, template: String, registry: Registry) -> Self {
		root.clear_children();

		let aliases = Rc::new(AliasChannel::default());
		let weak_aliases = Rc::downgrade(&aliases);
		let dispatcher: Listener = Rc::new(move |event: &Event| {
			let element = match event.current_target() {
				Some(element) => element,
				None => return,
			};
			if let Some(alias) = element.attribute(&format!("data-on{}", event.kind())) {
				if let Some(aliases) = weak_aliases.upgrade() {
					aliases.publish(&alias, event);
				}
			}
		});

		Self(Rc::new(DirectiveInner {
			root,
			template,
			registry,
			aliases,
			dispatcher,
		}))
	}

	/// The directive exposed on `element` by a [debug](`crate::registry::Config::debug`) registry.
	#[must_use]
	pub fn of(element: &Node) -> Option<Directive> {
		element.expando::<Directive>()
	}

	#[must_use]
	pub fn root(&self) -> &Node {
		&self.0.root
	}

	/// Re-renders the template with `data` and pushes the changes to the tree.
	///
	/// Afterwards, alias listeners are (re-)attached, nested directives that were already linked receive
	/// [`PARENT_UPDATE_EVENT`] and new directive markers are linked.
	///
	/// # Errors
	///
	/// If the template is malformed, or linking a nested directive fails.
	/// The tree is left as far as the update got.
	#[instrument(skip(self, data), fields(root = ?self.0.root))]
	pub fn update(&self, data: &Value) -> Result<(), Error> {
		let html = self.0.registry.render(&self.0.template, data)?;
		diff::reconcile_html(&self.0.root, &html);

		for event_type in self.0.registry.events() {
			let selector = Selector::parse(&format!("[data-on{}]", event_type))?;
			for element in self.select_all(&selector) {
				element.add_event_listener(event_type, Rc::clone(&self.0.dispatcher));
			}
		}

		let initialised = Selector::parse(&format!("{}.{}", DIRECTIVE_TAG, INITIALISED_CLASS))?;
		for element in self.select_all(&initialised) {
			element.dispatch_event(&Event::new(PARENT_UPDATE_EVENT));
		}

		self.0.registry.link_all(self)?;
		Ok(())
	}

	/// Matching descendants outside of isolated subtrees, in document order.
	///
	/// Isolated elements themselves are included if they match.
	#[must_use]
	pub fn select_all(&self, selector: &Selector) -> Vec<Node> {
		let mut found = Vec::new();
		collect_managed(&self.0.root, &|element| selector.matches(element), &mut found);
		found
	}

	fn named_fields(&self) -> Vec<Node> {
		let mut found = Vec::new();
		collect_managed(&self.0.root, &|element| element.has_attribute("name"), &mut found);
		found
	}

	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, Error> {
		Ok(self.select_all(&Selector::parse(selector)?))
	}

	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, Error> {
		Ok(self.query_selector_all(selector)?.into_iter().next())
	}

	/// Subscribes `callback` to the event alias `alias`. It receives the aliased native event.
	///
	/// The returned function removes exactly this subscription.
	pub fn on(&self, alias: &str, callback: impl Fn(&Event) + 'static) -> impl FnOnce() {
		let id = self.0.aliases.subscribe(alias, Rc::new(callback));
		let aliases = Rc::downgrade(&self.0.aliases);
		let alias = alias.to_owned();
		move || {
			if let Some(aliases) = aliases.upgrade() {
				aliases.unsubscribe(&alias, id);
			}
		}
	}

	fn fields(&self, name: &str) -> Vec<Node> {
		self.named_fields()
			.into_iter()
			.filter(|element| element.attribute("name").as_deref() == Some(name))
			.collect()
	}

	/// The value of the form field `name`:
	///
	/// - checkbox: its checkedness,
	/// - radio group: the value of the checked option, [`None`] if none is checked,
	/// - number input: its value as parsed by `parseFloat`,
	/// - anything else: its value as string.
	///
	/// [`None`] if there is no such field.
	#[must_use]
	pub fn get_model(&self, name: &str) -> Option<Value> {
		let fields = self.fields(name);
		let element = fields.first()?;
		match element.attribute("type").as_deref() {
			Some("number") => Some(Value::Number(parse_float(&element.value()))),
			Some("checkbox") => Some(Value::Bool(element.checked())),
			Some("radio") => fields.iter().find(|option| option.checked()).map(|option| Value::String(option.value())),
			_ => Some(Value::String(element.value())),
		}
	}

	#[must_use]
	pub fn get_model_or(&self, name: &str, default: impl Into<Value>) -> Value {
		self.get_model(name).unwrap_or_else(|| default.into())
	}

	/// All named form fields as a flat [`Value::Map`]. Radio groups without checked option are left out.
	#[must_use]
	pub fn model(&self) -> Value {
		let mut model = HashMap::new();
		for element in self.named_fields() {
			let name = element.attribute("name").unwrap_or_default();
			if model.contains_key(&name) {
				continue;
			}
			if let Some(value) = self.get_model(&name) {
				model.insert(name, value);
			}
		}
		Value::Map(model)
	}

	/// Sets the form field `name`:
	///
	/// - checkbox: checkedness to the truthiness of `value`,
	/// - radio group: checks exactly the option whose value equals `value`,
	/// - anything else: the value as string.
	///
	/// # Errors
	///
	/// [`Error::MissingField`] iff there is no such field.
	pub fn set_model(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
		let value = value.into();
		let fields = self.fields(name);
		let element = fields.first().ok_or_else(|| Error::MissingField(name.to_owned()))?;
		match element.attribute("type").as_deref() {
			Some("checkbox") => element.set_checked(value.is_truthy()),
			Some("radio") => {
				let value = value.to_string();
				for option in &fields {
					option.set_checked(option.value() == value);
				}
			}
			_ => element.set_value(&value.to_string()),
		}
		Ok(())
	}
}

impl Scope for Directive {
	fn select_all(&self, selector: &Selector) -> Vec<Node> {
		Directive::select_all(self, selector)
	}
}

fn collect_managed(node: &Node, predicate: &dyn Fn(&Node) -> bool, found: &mut Vec<Node>) {
	for child in node.child_nodes() {
		if !child.is_element() {
			continue;
		}
		if predicate(&child) {
			found.push(child.clone());
		}
		if !child.has_class(ISOLATE_CLASS) {
			collect_managed(&child, predicate, found);
		}
	}
}

/// Parses the longest numeric prefix of `text` like `parseFloat`, or returns `NaN`.
#[must_use]
pub fn parse_float(text: &str) -> f64 {
	let text = text.trim_start();
	let bytes = text.as_bytes();
	let is_digit = |i: usize| bytes.get(i).map_or(false, u8::is_ascii_digit);

	let mut i = 0;
	if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
		i += 1;
	}
	if text[i..].starts_with("Infinity") {
		return if bytes[0] == b'-' { f64::NEG_INFINITY } else { f64::INFINITY };
	}

	let mut digits = 0;
	while is_digit(i) {
		i += 1;
		digits += 1;
	}
	if bytes.get(i) == Some(&b'.') {
		i += 1;
		while is_digit(i) {
			i += 1;
			digits += 1;
		}
	}
	if digits == 0 {
		return f64::NAN;
	}

	if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
		let mut j = i + 1;
		if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
			j += 1;
		}
		let exponent_start = j;
		while is_digit(j) {
			j += 1;
		}
		if j > exponent_start {
			i = j;
		}
	}

	text[..i].parse().unwrap_or(f64::NAN)
}
