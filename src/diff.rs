//! Recreates a source tree in a live target tree by making only small adjustments.
//!
//! Nodes are matched by position. A target node is kept iff it has the same kind and name as its source
//! counterpart (and, for form controls, the same `type` attribute). Kept elements get their attributes
//! synchronised and their children reconciled recursively; any other target node is replaced by the source node.
//!
//! Non-markup state such as an `<input>`'s value or checkedness lives on the node object,
//! so it survives exactly as long as the node is kept.
//!
//! Classes prefixed with `muu-` on a kept element are preserved.
//! Elements with the class `muu-isolate` have their attributes synchronised, but their children are never touched.
//!
//! Matching being positional, reordering list items shifts their non-markup state to whichever item ends up at the old position.

use crate::dom::{Node, NodeKind};
use tracing::{error, instrument, trace, trace_span};

/// Marks an element whose children are managed elsewhere.
pub const ISOLATE_CLASS: &str = "muu-isolate";

/// Classes with this prefix survive attribute synchronisation.
pub const PRESERVED_CLASS_PREFIX: &str = "muu-";

/// Elements whose `type` attribute is part of their identity.
pub const FORM_CONTROLS: &[&str] = &["input", "button", "select", "textarea"];

/// Recursion depth after which reconciliation stops descending.
pub const DEFAULT_DEPTH_LIMIT: usize = 1024;

/// Whether `target` can be kept to represent `source`.
#[must_use]
pub fn is_same_node(target: &Node, source: &Node) -> bool {
	if target.kind() != source.kind() {
		return false;
	}
	let name = target.node_name();
	if name != source.node_name() {
		return false;
	}
	!FORM_CONTROLS.contains(&name.as_str()) || target.attribute("type") == source.attribute("type")
}

/// Makes `target` structurally equal to `source`.
///
/// If `target` must be replaced, it is replaced in its parent by `source` itself.
/// Source nodes that are adopted into the target tree are moved, not cloned.
#[instrument(skip(target, source))]
pub fn reconcile(target: &Node, source: &Node) {
	reconcile_node(target, source, DEFAULT_DEPTH_LIMIT);
}

/// Makes the children of `target` match the children of `source`, leaving `target` itself untouched.
#[instrument(skip(target, source))]
pub fn reconcile_children(target: &Node, source: &Node) {
	update_child_nodes(target, &source.child_nodes(), DEFAULT_DEPTH_LIMIT);
}

/// Parses `html` into detached nodes (owned by `target`'s document, if any) and makes the children of `target` match them.
#[instrument(skip(target, html), fields(len = html.len()))]
pub fn reconcile_html(target: &Node, html: &str) {
	let source = match target.owner_document() {
		Some(document) => document.parse_fragment(html),
		None => crate::dom::parse::parse_fragment(html),
	};
	update_child_nodes(target, &source, DEFAULT_DEPTH_LIMIT);
}

fn reconcile_node(target: &Node, source: &Node, depth_limit: usize) {
	if depth_limit == 0 {
		return error!("Depth limit reached");
	}

	if !is_same_node(target, source) {
		let span = trace_span!("Replacing mismatching", old = %target.node_name(), new = %source.node_name());
		let _enter = span.enter();
		match target.parent() {
			Some(parent) => {
				parent.replace_child(source, target);
			}
			None => error!("Cannot replace <{}> without a parent node. Skipping.", target.node_name()),
		}
		return;
	}

	match target.kind() {
		NodeKind::Element => {
			let span = trace_span!("Reconciling element", tag = %target.node_name());
			let _enter = span.enter();
			update_attributes(target, source);
			if target.has_class(ISOLATE_CLASS) {
				trace!("Isolated. Not descending.");
				return;
			}
			update_child_nodes(target, &source.child_nodes(), depth_limit - 1);
		}
		NodeKind::Text | NodeKind::Comment => {
			let data = source.data().unwrap_or_default();
			if target.data().as_deref() != Some(data.as_str()) {
				if cfg!(feature = "dangerous-logging") {
					trace!(data = %data, "Updating character data.");
				} else {
					trace!("Updating character data.");
				}
				target.set_data(&data);
			}
		}
	}
}

/// Reconciles the common prefix pairwise, then trims or extends `target`'s children.
fn update_child_nodes(target: &Node, source_children: &[Node], depth_limit: usize) {
	let target_children = target.child_nodes();
	for (t, s) in target_children.iter().zip(source_children) {
		reconcile_node(t, s, depth_limit);
	}
	for excess in target_children.iter().skip(source_children.len()) {
		trace!("Removing excess <{}>.", excess.node_name());
		target.remove_child(excess);
	}
	for missing in source_children.iter().skip(target_children.len()) {
		trace!("Appending <{}>.", missing.node_name());
		target.append_child(missing);
	}
}

fn update_attributes(target: &Node, source: &Node) {
	let source_classes = source.classes();
	let missing_preserved: Vec<String> = target
		.classes()
		.into_iter()
		.filter(|class| class.starts_with(PRESERVED_CLASS_PREFIX) && !source_classes.contains(class))
		.collect();
	let class = if missing_preserved.is_empty() {
		source.attribute("class")
	} else {
		Some(source_classes.into_iter().chain(missing_preserved).collect::<Vec<_>>().join(" "))
	};

	for name in target.attribute_names() {
		if !source.has_attribute(&name) && !(name == "class" && class.is_some()) {
			trace!(attribute = %name, "Removing attribute.");
			target.remove_attribute(&name);
		}
	}
	for name in source.attribute_names() {
		if name == "class" {
			continue;
		}
		set_attribute_if_changed(target, &name, &source.attribute(&name).unwrap_or_default());
	}
	if let Some(class) = class {
		set_attribute_if_changed(target, "class", &class);
	}
}

fn set_attribute_if_changed(target: &Node, name: &str, value: &str) {
	if target.attribute(name).as_deref() == Some(value) {
		return;
	}
	if cfg!(feature = "dangerous-logging") {
		trace!(attribute = name, value, "Setting attribute.");
	} else {
		trace!(attribute = name, "Setting attribute.");
	}
	target.set_attribute(name, value);
}
