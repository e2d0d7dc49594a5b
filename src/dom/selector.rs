//! The CSS selector subset used for queries: compound selectors (`tag`, `*`, `.class`, `#id`, `[attr]`,
//! `[attr=value]`, `:not(…)`), the descendant combinator and comma-separated groups.

use super::Node;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeTest {
	Exists(String),
	Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeTest>,
	negations: Vec<Compound>,
}

impl Compound {
	fn matches(&self, node: &Node) -> bool {
		if !node.is_element() {
			return false;
		}
		if let Some(tag) = &self.tag {
			if node.node_name() != *tag {
				return false;
			}
		}
		if let Some(id) = &self.id {
			if node.attribute("id").as_deref() != Some(id.as_str()) {
				return false;
			}
		}
		self.classes.iter().all(|class| node.has_class(class))
			&& self.attributes.iter().all(|test| match test {
				AttributeTest::Exists(name) => node.has_attribute(name),
				AttributeTest::Equals(name, value) => node.attribute(name).as_deref() == Some(value.as_str()),
			}) && !self.negations.iter().any(|negation| negation.matches(node))
	}
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	/// Each group lists compounds outermost first.
	groups: Vec<Vec<Compound>>,
}

impl Selector {
	/// # Errors
	///
	/// Iff `selector` is empty or uses unsupported syntax.
	pub fn parse(selector: &str) -> Result<Self, Error> {
		let invalid = || Error::Selector(selector.to_owned());
		let mut parser = SelectorParser {
			chars: selector.chars().collect(),
			pos: 0,
		};
		let mut groups = Vec::new();
		loop {
			let mut group = Vec::new();
			loop {
				parser.skip_whitespace();
				if parser.at_end() || parser.peek() == Some(',') {
					break;
				}
				group.push(parser.compound().ok_or_else(invalid)?);
			}
			if group.is_empty() {
				return Err(invalid());
			}
			groups.push(group);
			if parser.peek() == Some(',') {
				parser.pos += 1;
			} else {
				break;
			}
		}
		Ok(Self { groups })
	}

	/// Whether `node` matches any group. Ancestors are not limited to a query root.
	#[must_use]
	pub fn matches(&self, node: &Node) -> bool {
		self.groups.iter().any(|group| match group.split_last() {
			Some((last, ancestors)) => last.matches(node) && matches_ancestors(ancestors, node),
			None => false,
		})
	}
}

fn matches_ancestors(compounds: &[Compound], node: &Node) -> bool {
	let (last, rest) = match compounds.split_last() {
		Some(split) => split,
		None => return true,
	};
	let mut ancestor = node.parent();
	while let Some(candidate) = ancestor {
		if last.matches(&candidate) && matches_ancestors(rest, &candidate) {
			return true;
		}
		ancestor = candidate.parent();
	}
	false
}

struct SelectorParser {
	chars: Vec<char>,
	pos: usize,
}

impl SelectorParser {
	fn at_end(&self) -> bool {
		self.pos >= self.chars.len()
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn skip_whitespace(&mut self) {
		while self.peek().map_or(false, char::is_whitespace) {
			self.pos += 1;
		}
	}

	fn eat(&mut self, expected: &str) -> bool {
		let expected: Vec<char> = expected.chars().collect();
		if self.chars[self.pos..].starts_with(&expected) {
			self.pos += expected.len();
			true
		} else {
			false
		}
	}

	fn identifier(&mut self) -> Option<String> {
		let start = self.pos;
		while self.peek().map_or(false, |c| c.is_alphanumeric() || c == '-' || c == '_') {
			self.pos += 1;
		}
		if self.pos == start {
			None
		} else {
			Some(self.chars[start..self.pos].iter().collect())
		}
	}

	/// Parses one compound selector, stopping before whitespace, `,` or `)`.
	fn compound(&mut self) -> Option<Compound> {
		let start = self.pos;
		let mut compound = Compound::default();
		if self.eat("*") {
			compound.tag = None;
		} else if self.peek().map_or(false, char::is_alphabetic) {
			compound.tag = Some(self.identifier()?.to_ascii_lowercase());
		}
		while let Some(c) = self.peek() {
			match c {
				'.' => {
					self.pos += 1;
					compound.classes.push(self.identifier()?);
				}
				'#' => {
					self.pos += 1;
					compound.id = Some(self.identifier()?);
				}
				'[' => {
					self.pos += 1;
					compound.attributes.push(self.attribute_test()?);
				}
				':' => {
					if !self.eat(":not(") {
						return None;
					}
					self.skip_whitespace();
					let negation = self.compound()?;
					self.skip_whitespace();
					if !self.eat(")") {
						return None;
					}
					compound.negations.push(negation);
				}
				c if c.is_whitespace() || c == ',' || c == ')' => break,
				_ => return None,
			}
		}
		if self.pos == start {
			return None;
		}
		Some(compound)
	}

	fn attribute_test(&mut self) -> Option<AttributeTest> {
		self.skip_whitespace();
		let name = self.identifier()?.to_ascii_lowercase();
		self.skip_whitespace();
		if self.eat("]") {
			return Some(AttributeTest::Exists(name));
		}
		if !self.eat("=") {
			return None;
		}
		self.skip_whitespace();
		let value = match self.peek()? {
			quote @ '"' | quote @ '\'' => {
				self.pos += 1;
				let start = self.pos;
				while self.peek()? != quote {
					self.pos += 1;
				}
				let value: String = self.chars[start..self.pos].iter().collect();
				self.pos += 1;
				value
			}
			_ => self.identifier()?,
		};
		self.skip_whitespace();
		if self.eat("]") {
			Some(AttributeTest::Equals(name, value))
		} else {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Selector;
	use crate::dom::Node;

	#[test]
	fn rejects_garbage() {
		assert!(Selector::parse("").is_err());
		assert!(Selector::parse("div >").is_err());
		assert!(Selector::parse("[name").is_err());
		assert!(Selector::parse("a,").is_err());
	}

	#[test]
	fn matches_compounds_and_descendants() {
		let root = Node::element("div");
		root.set_inner_html(r#"<p class="a b"><input name="x-y" type="radio"></p><muu class="muu-initialised"></muu>"#);
		let input = root.query_selector("p.a input[name=x-y]").unwrap().unwrap();
		assert_eq!(input.node_name(), "input");
		assert_eq!(root.query_selector_all(r#"[name="x-y"], muu"#).unwrap().len(), 2);
		assert!(root.query_selector("muu:not(.muu-initialised)").unwrap().is_none());
		assert_eq!(root.query_selector_all("*").unwrap().len(), 3);
	}
}
