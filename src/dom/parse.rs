//! A lenient HTML fragment parser for rendered template output.
//!
//! Never fails: stray closing tags are ignored, unclosed elements end with the input,
//! unknown character references are kept verbatim.

use super::{DocumentShared, Node, VOID_ELEMENTS};
use std::rc::Weak;
use tracing::trace;

/// Parses `html` into detached nodes belonging to no document.
#[must_use]
pub fn parse_fragment(html: &str) -> Vec<Node> {
	parse_nodes(html, &Weak::new())
}

pub(crate) fn parse_nodes(html: &str, owner: &Weak<DocumentShared>) -> Vec<Node> {
	let mut parser = HtmlParser {
		html,
		pos: 0,
		owner,
		roots: Vec::new(),
		open: Vec::new(),
	};
	parser.run();
	trace!("Parsed {} top-level node(s).", parser.roots.len());
	parser.roots
}

struct HtmlParser<'a> {
	html: &'a str,
	pos: usize,
	owner: &'a Weak<DocumentShared>,
	roots: Vec<Node>,
	open: Vec<Node>,
}

impl<'a> HtmlParser<'a> {
	fn rest(&self) -> &'a str {
		&self.html[self.pos..]
	}

	fn insert(&mut self, node: Node) {
		match self.open.last() {
			Some(parent) => parent.append_child(&node),
			None => self.roots.push(node),
		}
	}

	fn run(&mut self) {
		while self.pos < self.html.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				let body = &rest[4..];
				let (data, consumed) = match body.find("-->") {
					Some(end) => (&body[..end], 4 + end + 3),
					None => (body, rest.len()),
				};
				self.pos += consumed;
				let comment = Node::new_comment(data, self.owner.clone());
				self.insert(comment);
			} else if rest.starts_with("</") {
				self.close_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") {
				// Doctype or processing instruction.
				self.pos += rest.find('>').map_or(rest.len(), |end| end + 1);
			} else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
				self.open_tag();
			} else {
				self.text();
			}
		}
	}

	fn text(&mut self) {
		let rest = self.rest();
		// A `<` that doesn't start markup is text.
		let end = rest
			.char_indices()
			.skip(1)
			.find(|&(i, c)| c == '<' && starts_markup(&rest[i..]))
			.map_or(rest.len(), |(i, _)| i);
		let text = decode_entities(&rest[..end]);
		self.pos += end;

		let previous = match self.open.last() {
			Some(parent) => parent.child_nodes().pop(),
			None => self.roots.last().cloned(),
		};
		if let Some(previous) = previous.filter(|p| p.kind() == super::NodeKind::Text) {
			let mut data = previous.data().unwrap_or_default();
			data.push_str(&text);
			previous.set_data(&data);
		} else {
			let node = Node::new_text(&text, self.owner.clone());
			self.insert(node);
		}
	}

	fn close_tag(&mut self) {
		let rest = self.rest();
		let end = rest.find('>').map_or(rest.len(), |end| end + 1);
		let name = rest[2..end].trim_end_matches('>').trim().to_ascii_lowercase();
		self.pos += end;
		if let Some(index) = self.open.iter().rposition(|n| n.node_name() == name) {
			self.open.truncate(index);
		} else {
			trace!("Ignoring stray closing tag </{}>.", name);
		}
	}

	fn open_tag(&mut self) {
		self.pos += 1;
		let name = self.take_while(|c| !c.is_whitespace() && c != '/' && c != '>').to_ascii_lowercase();
		let element = Node::new_element(&name, self.owner.clone());

		loop {
			self.take_while(char::is_whitespace);
			let rest = self.rest();
			if rest.is_empty() {
				break;
			}
			if rest.starts_with('>') {
				self.pos += 1;
				break;
			}
			if rest.starts_with("/>") {
				self.pos += 2;
				break;
			}
			if rest.starts_with('/') {
				self.pos += 1;
				continue;
			}

			let attribute = self.take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/').to_ascii_lowercase();
			self.take_while(char::is_whitespace);
			let value = if self.rest().starts_with('=') {
				self.pos += 1;
				self.take_while(char::is_whitespace);
				self.attribute_value()
			} else {
				String::new()
			};
			if !attribute.is_empty() && !element.has_attribute(&attribute) {
				element.set_attribute(&attribute, &value);
			}
		}

		let is_void = VOID_ELEMENTS.contains(&name.as_str());
		self.insert(element.clone());
		if !is_void {
			self.open.push(element);
		}
	}

	fn attribute_value(&mut self) -> String {
		let rest = self.rest();
		match rest.chars().next() {
			Some(quote) if quote == '"' || quote == '\'' => {
				let body = &rest[1..];
				let (raw, consumed) = match body.find(quote) {
					Some(end) => (&body[..end], end + 2),
					None => (body, rest.len()),
				};
				self.pos += consumed;
				decode_entities(raw)
			}
			_ => decode_entities(self.take_while(|c| !c.is_whitespace() && c != '>')),
		}
	}

	fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
		let rest = self.rest();
		let end = rest.find(|c: char| !predicate(c)).unwrap_or(rest.len());
		self.pos += end;
		&rest[..end]
	}
}

fn starts_markup(text: &str) -> bool {
	let mut chars = text.chars().skip(1);
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
}

/// Decodes named (`amp lt gt quot apos nbsp`) and numeric character references.
#[must_use]
pub fn decode_entities(text: &str) -> String {
	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		decoded.push_str(&rest[..amp]);
		rest = &rest[amp..];
		let replacement = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
			let entity = &rest[1..end];
			let c = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity.strip_prefix('#').and_then(|number| {
					let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
						Some(hex) => u32::from_str_radix(hex, 16).ok(),
						None => number.parse().ok(),
					};
					code.and_then(char::from_u32)
				}),
			};
			c.map(|c| (c, end + 1))
		});
		match replacement {
			Some((c, consumed)) => {
				decoded.push(c);
				rest = &rest[consumed..];
			}
			None => {
				decoded.push('&');
				rest = &rest[1..];
			}
		}
	}
	decoded.push_str(rest);
	decoded
}

#[cfg(test)]
mod tests {
	use super::{decode_entities, parse_fragment};

	#[test]
	fn decodes_escaped_template_output() {
		assert_eq!(decode_entities("&lt;&quot;&amp;&gt;&#39;&#x2F;"), "<\"&>'/");
		assert_eq!(decode_entities("a & b &unknown; &#65;"), "a & b &unknown; A");
	}

	#[test]
	fn parses_void_and_nested_elements() {
		let nodes = parse_fragment(r#"<input name="a" value='x &amp; y' disabled><ul><li>1</li><li>2</li></ul>tail"#);
		assert_eq!(nodes.len(), 3);
		assert_eq!(nodes[0].attribute("value").as_deref(), Some("x & y"));
		assert_eq!(nodes[0].attribute("disabled").as_deref(), Some(""));
		assert_eq!(nodes[1].child_count(), 2);
		assert_eq!(nodes[2].data().as_deref(), Some("tail"));
	}

	#[test]
	fn keeps_stray_angle_brackets_as_text() {
		let nodes = parse_fragment("1 < 2 </b> <!-- c --> 3");
		assert_eq!(nodes.len(), 3);
		assert_eq!(nodes[0].data().as_deref(), Some("1 < 2  "));
		assert_eq!(nodes[1].data().as_deref(), Some(" c "));
	}
}
