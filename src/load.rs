//! Loads live browser DOM content into [`Document`]-owned [`Node`]s, so server-rendered markup can be linked.

use crate::dom::{Document, Node};
use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Attr, Comment, Element, NamedNodeMap, Node as wNode, NodeList, Text};

/// Appends copies of `child_nodes` to `parent`.
pub fn load_child_nodes(child_nodes: &NodeList, parent: &Node, document: &Document) {
	for i in 0..child_nodes.length() {
		let child = match child_nodes.item(i) {
			Some(child) => child,
			None => continue,
		};
		if let Some(element) = child.dyn_ref::<Element>() {
			parent.append_child(&load_element(element, document));
		} else if let Some(text) = child.dyn_ref::<Text>() {
			parent.append_child(&document.create_text_node(&text.data()));
		} else if let Some(comment) = child.dyn_ref::<Comment>() {
			parent.append_child(&document.create_comment(&comment.data()));
		} else {
			warn!("Skipping unrecognised child node: {:?}", child);
		}
	}
}

/// Copies `element` with its attributes and content. Form state that isn't reflected in markup is not copied.
#[must_use]
pub fn load_element(element: &Element, document: &Document) -> Node {
	let node: &wNode = element.as_ref();
	let copy = document.create_element(&element.tag_name());
	load_attributes(&element.attributes(), &copy);
	load_child_nodes(&node.child_nodes(), &copy, document);
	copy
}

pub fn load_attributes(attributes: &NamedNodeMap, target: &Node) {
	for i in 0..attributes.length() {
		if let Some(attribute) = attributes.item(i) {
			load_attribute(&attribute, target);
		}
	}
}

pub fn load_attribute(attribute: &Attr, target: &Node) {
	target.set_attribute(&attribute.local_name(), &attribute.value());
}
