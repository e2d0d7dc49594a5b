//! An in-memory live document tree.
//!
//! [`Node`] mirrors the subset of the [***DOM***](https://developer.mozilla.org/en-US/docs/Web/API/Document_Object_Model)
//! that templates, the reconciler and directives need: elements, text and comments,
//! attribute and class access, interactive form state, bubbling events and document-level mutation observation.
//!
//! Handles are cheap to clone and compare by identity.

pub mod parse;
pub mod selector;

pub use selector::Selector;

use crate::Error;
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{error, trace};

/// Tags serialized without content or closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

pub type Listener = Rc<dyn Fn(&Event)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
}

enum Content {
	Element { name: String, attributes: Vec<(String, String)> },
	Text(String),
	Comment(String),
}

struct NodeData {
	content: Content,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<Node>,
	owner: Weak<DocumentShared>,
	/// Dirty form state. Never serialized.
	value: Option<String>,
	checked: Option<bool>,
	listeners: Vec<(String, Listener)>,
	expando: Option<Rc<dyn Any>>,
}

#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

#[derive(Clone, Default)]
pub struct WeakNode(Weak<RefCell<NodeData>>);

impl WeakNode {
	#[must_use]
	pub fn upgrade(&self) -> Option<Node> {
		self.0.upgrade().map(Node)
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Node {}

impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		match &data.content {
			Content::Element { name, attributes } => {
				write!(f, "<{}", name)?;
				for (name, _) in attributes {
					write!(f, " {}", name)?;
				}
				write!(f, "> ({} child node(s))", data.children.len())
			}
			Content::Text(_) => f.write_str("#text"),
			Content::Comment(_) => f.write_str("#comment"),
		}
	}
}

impl Node {
	fn new(content: Content, owner: Weak<DocumentShared>) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			content,
			parent: Weak::new(),
			children: Vec::new(),
			owner,
			value: None,
			checked: None,
			listeners: Vec::new(),
			expando: None,
		})))
	}

	pub(crate) fn new_element(name: &str, owner: Weak<DocumentShared>) -> Self {
		Self::new(
			Content::Element {
				name: name.to_ascii_lowercase(),
				attributes: Vec::new(),
			},
			owner,
		)
	}

	pub(crate) fn new_text(data: &str, owner: Weak<DocumentShared>) -> Self {
		Self::new(Content::Text(data.to_owned()), owner)
	}

	pub(crate) fn new_comment(data: &str, owner: Weak<DocumentShared>) -> Self {
		Self::new(Content::Comment(data.to_owned()), owner)
	}

	/// Creates an element that belongs to no document.
	#[must_use]
	pub fn element(name: &str) -> Self {
		Self::new_element(name, Weak::new())
	}

	#[must_use]
	pub fn text(data: &str) -> Self {
		Self::new_text(data, Weak::new())
	}

	#[must_use]
	pub fn comment(data: &str) -> Self {
		Self::new_comment(data, Weak::new())
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakNode {
		WeakNode(Rc::downgrade(&self.0))
	}

	#[must_use]
	pub fn kind(&self) -> NodeKind {
		match self.0.borrow().content {
			Content::Element { .. } => NodeKind::Element,
			Content::Text(_) => NodeKind::Text,
			Content::Comment(_) => NodeKind::Comment,
		}
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		self.kind() == NodeKind::Element
	}

	/// Lowercase tag name for elements, `#text` or `#comment` otherwise.
	#[must_use]
	pub fn node_name(&self) -> String {
		match &self.0.borrow().content {
			Content::Element { name, .. } => name.clone(),
			Content::Text(_) => "#text".to_owned(),
			Content::Comment(_) => "#comment".to_owned(),
		}
	}

	#[must_use]
	pub fn owner_document(&self) -> Option<Document> {
		self.0.borrow().owner.upgrade().map(Document)
	}

	fn record_mutation(&self) {
		let owner = self.0.borrow().owner.upgrade();
		if let Some(owner) = owner {
			if self.is_descendant_of(&owner.root) {
				owner.mutations.set(owner.mutations.get() + 1);
				owner.pending.set(true);
			}
		}
	}

	// Attributes

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &self.0.borrow().content {
			Content::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	/// Names in insertion order.
	#[must_use]
	pub fn attribute_names(&self) -> Vec<String> {
		match &self.0.borrow().content {
			Content::Element { attributes, .. } => attributes.iter().map(|(n, _)| n.clone()).collect(),
			_ => Vec::new(),
		}
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		let name = name.to_ascii_lowercase();
		{
			let mut data = self.0.borrow_mut();
			let attributes = match &mut data.content {
				Content::Element { attributes, .. } => attributes,
				_ => return error!("Tried to set attribute {:?} on a non-element node.", name),
			};
			match attributes.iter_mut().find(|(n, _)| *n == name) {
				Some((_, v)) => value.clone_into(v),
				None => attributes.push((name, value.to_owned())),
			}
		}
		self.record_mutation();
	}

	/// Returns whether the attribute was present.
	pub fn remove_attribute(&self, name: &str) -> bool {
		let removed = match &mut self.0.borrow_mut().content {
			Content::Element { attributes, .. } => {
				let len = attributes.len();
				attributes.retain(|(n, _)| n != name);
				attributes.len() != len
			}
			_ => false,
		};
		if removed {
			self.record_mutation();
		}
		removed
	}

	#[must_use]
	pub fn classes(&self) -> Vec<String> {
		self.attribute("class")
			.map(|class| class.split_ascii_whitespace().map(str::to_owned).collect())
			.unwrap_or_default()
	}

	#[must_use]
	pub fn has_class(&self, class: &str) -> bool {
		self.attribute("class").map_or(false, |classes| classes.split_ascii_whitespace().any(|c| c == class))
	}

	/// Appends `class` to the class list unless already present.
	pub fn add_class(&self, class: &str) {
		if self.has_class(class) {
			return;
		}
		let mut classes = self.classes();
		classes.push(class.to_owned());
		self.set_attribute("class", &classes.join(" "));
	}

	pub fn remove_class(&self, class: &str) {
		if !self.has_class(class) {
			return;
		}
		let classes: Vec<String> = self.classes().into_iter().filter(|c| c != class).collect();
		self.set_attribute("class", &classes.join(" "));
	}

	// Character data

	/// Text or comment data. [`None`] for elements.
	#[must_use]
	pub fn data(&self) -> Option<String> {
		match &self.0.borrow().content {
			Content::Text(data) | Content::Comment(data) => Some(data.clone()),
			Content::Element { .. } => None,
		}
	}

	pub fn set_data(&self, new_data: &str) {
		{
			let mut data = self.0.borrow_mut();
			match &mut data.content {
				Content::Text(data) | Content::Comment(data) => new_data.clone_into(data),
				Content::Element { .. } => return error!("Tried to set character data on an element."),
			}
		}
		self.record_mutation();
	}

	// Tree

	#[must_use]
	pub fn parent(&self) -> Option<Node> {
		self.0.borrow().parent.upgrade().map(Node)
	}

	#[must_use]
	pub fn child_nodes(&self) -> Vec<Node> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn child_count(&self) -> usize {
		self.0.borrow().children.len()
	}

	#[must_use]
	pub fn child(&self, index: usize) -> Option<Node> {
		self.0.borrow().children.get(index).cloned()
	}

	/// Whether `self` is `ancestor` or lies below it.
	#[must_use]
	pub fn is_descendant_of(&self, ancestor: &Node) -> bool {
		let mut current = Some(self.clone());
		while let Some(node) = current {
			if node == *ancestor {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Whether the node is part of its owner document's tree.
	#[must_use]
	pub fn is_connected(&self) -> bool {
		let owner = self.0.borrow().owner.upgrade();
		owner.map_or(false, |owner| self.is_descendant_of(&owner.root))
	}

	/// All descendants in document order, excluding `self`.
	#[must_use]
	pub fn descendants(&self) -> Vec<Node> {
		let mut found = Vec::new();
		self.collect_descendants(&mut found);
		found
	}

	fn collect_descendants(&self, found: &mut Vec<Node>) {
		for child in self.child_nodes() {
			found.push(child.clone());
			child.collect_descendants(found);
		}
	}

	/// Moves `child` (detaching it from any current parent) to the end of this node's children.
	pub fn append_child(&self, child: &Node) {
		self.insert_before(child, None);
	}

	/// Moves `child` before `reference`, or to the end if `reference` is [`None`] or not a child of `self`.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if self.is_descendant_of(child) {
			return error!("Refusing to insert a node into its own subtree.");
		}
		if !self.is_element() {
			return error!("Refusing to insert a child into a non-element node.");
		}
		child.remove();
		{
			let mut data = self.0.borrow_mut();
			let index = reference.and_then(|r| data.children.iter().position(|c| c == r)).unwrap_or(data.children.len());
			data.children.insert(index, child.clone());
		}
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.record_mutation();
	}

	/// Returns whether `child` was a child of `self`.
	pub fn remove_child(&self, child: &Node) -> bool {
		let removed = {
			let mut data = self.0.borrow_mut();
			match data.children.iter().position(|c| c == child) {
				Some(index) => {
					data.children.remove(index);
					true
				}
				None => false,
			}
		};
		if removed {
			child.0.borrow_mut().parent = Weak::new();
			self.record_mutation();
		}
		removed
	}

	/// Puts `new` in the place of `old`. Returns whether `old` was a child of `self`.
	pub fn replace_child(&self, new: &Node, old: &Node) -> bool {
		if new == old {
			return true;
		}
		if self.child_nodes().iter().all(|c| c != old) {
			return false;
		}
		self.insert_before(new, Some(old));
		self.remove_child(old)
	}

	/// Detaches the node from its parent, if any.
	pub fn remove(&self) {
		if let Some(parent) = self.parent() {
			parent.remove_child(self);
		}
	}

	pub fn clear_children(&self) {
		for child in self.child_nodes() {
			self.remove_child(&child);
		}
	}

	// Markup

	/// Concatenated data of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self) -> String {
		match &self.0.borrow().content {
			Content::Text(data) => return data.clone(),
			Content::Comment(_) => return String::new(),
			Content::Element { .. } => (),
		}
		self.descendants().iter().filter(|n| n.kind() == NodeKind::Text).filter_map(Node::data).collect()
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in self.child_nodes() {
			child.write_html(&mut html);
		}
		html
	}

	/// Replaces all children with nodes parsed from `html`.
	pub fn set_inner_html(&self, html: &str) {
		self.clear_children();
		let owner = self.0.borrow().owner.clone();
		for node in parse::parse_nodes(html, &owner) {
			self.append_child(&node);
		}
	}

	fn write_html(&self, html: &mut String) {
		let data = self.0.borrow();
		match &data.content {
			Content::Text(text) => escape_text(text, html),
			Content::Comment(comment) => {
				html.push_str("<!--");
				html.push_str(comment);
				html.push_str("-->");
			}
			Content::Element { name, attributes } => {
				html.push('<');
				html.push_str(name);
				for (name, value) in attributes {
					html.push(' ');
					html.push_str(name);
					html.push_str("=\"");
					escape_attribute(value, html);
					html.push('"');
				}
				html.push('>');
				if VOID_ELEMENTS.contains(&name.as_str()) {
					return;
				}
				for child in &data.children {
					child.write_html(html);
				}
				html.push_str("</");
				html.push_str(name);
				html.push('>');
			}
		}
	}

	// Form state

	/// The current value: the dirty value if one was set, otherwise the `value` attribute (or text content for `textarea`).
	#[must_use]
	pub fn value(&self) -> String {
		if let Some(value) = &self.0.borrow().value {
			return value.clone();
		}
		if self.node_name() == "textarea" {
			return self.text_content();
		}
		self.attribute("value").unwrap_or_default()
	}

	pub fn set_value(&self, value: &str) {
		self.0.borrow_mut().value = Some(value.to_owned());
	}

	/// The dirty checkedness if one was set, otherwise the presence of the `checked` attribute.
	#[must_use]
	pub fn checked(&self) -> bool {
		let dirty = self.0.borrow().checked;
		dirty.unwrap_or_else(|| self.has_attribute("checked"))
	}

	pub fn set_checked(&self, checked: bool) {
		self.0.borrow_mut().checked = Some(checked);
	}

	// Events

	/// Adding the same `Rc` twice for the same event type has no effect.
	pub fn add_event_listener(&self, kind: &str, listener: Listener) {
		let mut data = self.0.borrow_mut();
		if data.listeners.iter().any(|(k, l)| k == kind && Rc::ptr_eq(l, &listener)) {
			return;
		}
		data.listeners.push((kind.to_owned(), listener));
	}

	pub fn remove_event_listener(&self, kind: &str, listener: &Listener) {
		self.0.borrow_mut().listeners.retain(|(k, l)| !(k == kind && Rc::ptr_eq(l, listener)));
	}

	#[must_use]
	pub fn listener_count(&self, kind: &str) -> usize {
		self.0.borrow().listeners.iter().filter(|(k, _)| k == kind).count()
	}

	/// Runs matching listeners on `self`, then on each ancestor if the event bubbles.
	pub fn dispatch_event(&self, event: &Event) {
		event.target.replace(Some(self.clone()));
		let mut current = Some(self.clone());
		while let Some(node) = current {
			let listeners: Vec<Listener> = node
				.0
				.borrow()
				.listeners
				.iter()
				.filter(|(k, _)| *k == event.kind)
				.map(|(_, l)| Rc::clone(l))
				.collect();
			if !listeners.is_empty() {
				trace!("Dispatching {:?} to {} listener(s).", event.kind, listeners.len());
				event.current_target.replace(Some(node.clone()));
				for listener in listeners {
					listener(event);
				}
			}
			current = if event.bubbles { node.parent() } else { None };
		}
		event.current_target.replace(None);
	}

	// Expando

	/// Attaches an arbitrary value to the node, replacing any previous one.
	pub fn set_expando(&self, value: Rc<dyn Any>) {
		self.0.borrow_mut().expando = Some(value);
	}

	/// Detaches the attached value and returns it.
	pub fn take_expando(&self) -> Option<Rc<dyn Any>> {
		self.0.borrow_mut().expando.take()
	}

	#[must_use]
	pub fn expando<T: Any + Clone>(&self) -> Option<T> {
		self.0.borrow().expando.as_deref().and_then(|e| e.downcast_ref::<T>()).cloned()
	}

	// Queries

	#[must_use]
	pub fn matches(&self, selector: &Selector) -> bool {
		selector.matches(self)
	}

	/// Matching descendants in document order.
	#[must_use]
	pub fn select_all(&self, selector: &Selector) -> Vec<Node> {
		self.descendants().into_iter().filter(|n| selector.matches(n)).collect()
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
}

fn escape_text(text: &str, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'\u{a0}' => html.push_str("&nbsp;"),
			c => html.push(c),
		}
	}
}

fn escape_attribute(value: &str, html: &mut String) {
	for c in value.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'"' => html.push_str("&quot;"),
			'\u{a0}' => html.push_str("&nbsp;"),
			c => html.push(c),
		}
	}
}

/// Subscribes `callback` to `kind` events on `node`. The returned function removes exactly that subscription.
pub fn on(node: &Node, kind: &str, callback: impl Fn(&Event) + 'static) -> impl FnOnce() {
	let listener: Listener = Rc::new(callback);
	node.add_event_listener(kind, Rc::clone(&listener));
	let node = node.downgrade();
	let kind = kind.to_owned();
	move || {
		if let Some(node) = node.upgrade() {
			node.remove_event_listener(&kind, &listener);
		}
	}
}

/// A structured event with an opaque payload.
pub struct Event {
	kind: String,
	bubbles: bool,
	detail: Option<Rc<dyn Any>>,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
}

impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("kind", &self.kind)
			.field("bubbles", &self.bubbles)
			.field("has_detail", &self.detail.is_some())
			.finish()
	}
}

impl Event {
	/// A non-bubbling event.
	#[must_use]
	pub fn new(kind: &str) -> Self {
		Self {
			kind: kind.to_owned(),
			bubbles: false,
			detail: None,
			target: RefCell::new(None),
			current_target: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn bubbling(kind: &str) -> Self {
		Self { bubbles: true, ..Self::new(kind) }
	}

	#[must_use]
	pub fn with_detail(mut self, detail: Rc<dyn Any>) -> Self {
		self.detail = Some(detail);
		self
	}

	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	#[must_use]
	pub fn bubbles(&self) -> bool {
		self.bubbles
	}

	#[must_use]
	pub fn detail<T: Any>(&self) -> Option<&T> {
		self.detail.as_deref().and_then(|d| d.downcast_ref::<T>())
	}

	#[must_use]
	pub fn target(&self) -> Option<Node> {
		self.target.borrow().clone()
	}

	/// The node whose listener is currently running.
	#[must_use]
	pub fn current_target(&self) -> Option<Node> {
		self.current_target.borrow().clone()
	}
}

/// Whether a mutation observer stays registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverControl {
	Continue,
	Disconnect,
}

type Observer = Rc<RefCell<dyn FnMut() -> ObserverControl>>;

pub(crate) struct DocumentShared {
	root: Node,
	mutations: Cell<u64>,
	pending: Cell<bool>,
	observers: RefCell<Vec<(u64, Observer)>>,
	next_observer: Cell<u64>,
}

/// Owner of a connected tree (`<html><body></body></html>`).
///
/// Mutations of connected nodes are queued and delivered to observers by [`Document::flush`],
/// which stands in for the event loop turn after the mutation.
#[derive(Clone)]
pub struct Document(Rc<DocumentShared>);

impl Debug for Document {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("mutations", &self.0.mutations.get())
			.field("pending", &self.0.pending.get())
			.field("observers", &self.0.observers.borrow().len())
			.finish()
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	#[must_use]
	pub fn new() -> Self {
		let shared = Rc::new_cyclic(|weak: &Weak<DocumentShared>| DocumentShared {
			root: Node::new_element("html", weak.clone()),
			mutations: Cell::new(0),
			pending: Cell::new(false),
			observers: RefCell::new(Vec::new()),
			next_observer: Cell::new(0),
		});
		let document = Self(shared);
		let body = document.create_element("body");
		document.document_element().append_child(&body);
		document.0.mutations.set(0);
		document.0.pending.set(false);
		document
	}

	#[must_use]
	pub fn document_element(&self) -> Node {
		self.0.root.clone()
	}

	#[must_use]
	pub fn body(&self) -> Node {
		self.0
			.root
			.child_nodes()
			.into_iter()
			.find(|n| n.node_name() == "body")
			.unwrap_or_else(|| self.0.root.clone())
	}

	#[must_use]
	pub fn create_element(&self, name: &str) -> Node {
		Node::new_element(name, Rc::downgrade(&self.0))
	}

	#[must_use]
	pub fn create_text_node(&self, data: &str) -> Node {
		Node::new_text(data, Rc::downgrade(&self.0))
	}

	#[must_use]
	pub fn create_comment(&self, data: &str) -> Node {
		Node::new_comment(data, Rc::downgrade(&self.0))
	}

	/// Parses `html` into detached nodes owned by this document.
	#[must_use]
	pub fn parse_fragment(&self, html: &str) -> Vec<Node> {
		parse::parse_nodes(html, &Rc::downgrade(&self.0))
	}

	/// Number of mutations applied to connected nodes so far.
	#[must_use]
	pub fn mutation_count(&self) -> u64 {
		self.0.mutations.get()
	}

	/// Registers `observer`, which runs on each [`flush`](`Document::flush`) that follows a mutation of the connected tree.
	pub fn observe(&self, observer: impl FnMut() -> ObserverControl + 'static) -> ObserverHandle {
		let id = self.0.next_observer.get();
		self.0.next_observer.set(id + 1);
		let observer: Observer = Rc::new(RefCell::new(observer));
		self.0.observers.borrow_mut().push((id, observer));
		ObserverHandle {
			id,
			document: Rc::downgrade(&self.0),
		}
	}

	#[must_use]
	pub fn observer_count(&self) -> usize {
		self.0.observers.borrow().len()
	}

	/// Delivers pending mutation notifications until no more are queued.
	pub fn flush(&self) {
		while self.0.pending.replace(false) {
			let observers: Vec<(u64, Observer)> = self.0.observers.borrow().clone();
			trace!("Notifying {} mutation observer(s).", observers.len());
			for (id, observer) in observers {
				if !self.0.observers.borrow().iter().any(|(i, _)| *i == id) {
					continue;
				}
				let control = match observer.try_borrow_mut() {
					Ok(mut observer) => (&mut *observer)(),
					Err(_) => continue,
				};
				if control == ObserverControl::Disconnect {
					disconnect(&self.0, id);
				}
			}
		}
	}
}

fn disconnect(shared: &DocumentShared, id: u64) {
	shared.observers.borrow_mut().retain(|(i, _)| *i != id);
}

/// Registration of a [`Document::observe`] callback.
#[derive(Debug)]
pub struct ObserverHandle {
	id: u64,
	document: Weak<DocumentShared>,
}

impl ObserverHandle {
	pub fn disconnect(self) {
		if let Some(document) = self.document.upgrade() {
			disconnect(&document, self.id);
		}
	}
}

/// Runs `callback` once, on the first [`Document::flush`] that finds `element` outside its document.
/// That includes elements that were never inserted, and elements that have been dropped.
/// The observer disconnects itself after firing.
///
/// Returns [`None`] if `element` has no owner document.
pub fn destroy(element: &Node, callback: impl FnOnce() + 'static) -> Option<ObserverHandle> {
	let document = element.owner_document()?;
	let element = element.downgrade();
	let mut callback = Some(callback);
	Some(document.observe(move || {
		if element.upgrade().map_or(false, |element| element.is_connected()) {
			return ObserverControl::Continue;
		}
		if let Some(callback) = callback.take() {
			callback();
		}
		ObserverControl::Disconnect
	}))
}
