//! The data a template is rendered against.

use core::fmt::{self, Display, Formatter};
use hashbrown::HashMap;
use num_traits::{Float, Zero};

/// A dynamically typed template context or form-model value.
///
/// Missing keys are represented by [`None`] at lookup sites rather than by a dedicated variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	List(Vec<Value>),
	Map(HashMap<String, Value>),
}

impl Default for Value {
	fn default() -> Self {
		Value::Null
	}
}

impl Value {
	/// Builds a [`Value::Map`] from key/value pairs.
	pub fn map<K: Into<String>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
		Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// Resolves `key` against this context.
	///
	/// `this` always refers to the context itself.
	#[must_use]
	pub fn lookup(&self, key: &str) -> Option<&Value> {
		if key == "this" {
			return Some(self);
		}
		match self {
			Value::Map(map) => map.get(key),
			_ => None,
		}
	}

	/// Whether the value counts as set in a loop or pair-set test.
	///
	/// `false`, `null`, `0`, `NaN` and `""` are falsy. Sequences and mappings are always truthy, even when empty.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => !(n.is_zero() || Float::is_nan(*n)),
			Value::String(s) => !s.is_empty(),
			Value::List(_) | Value::Map(_) => true,
		}
	}

	/// The text a `{{variable}}` tag emits before escaping.
	///
	/// Falsy values render as the empty string, except for the number `0`, which renders as `"0"`.
	#[must_use]
	pub fn to_variable_text(&self) -> String {
		match self {
			Value::Number(n) if n.is_zero() => "0".to_owned(),
			v if !v.is_truthy() => String::new(),
			v => v.to_string(),
		}
	}

	#[must_use]
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}
}

fn fmt_number(n: f64, f: &mut Formatter<'_>) -> fmt::Result {
	if n.is_nan() {
		f.write_str("NaN")
	} else if n.is_infinite() {
		f.write_str(if n.is_sign_negative() { "-Infinity" } else { "Infinity" })
	} else if n.is_zero() {
		// Covers `-0`.
		f.write_str("0")
	} else {
		write!(f, "{}", n)
	}
}

/// String conversion as a browser runtime performs it.
impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Number(n) => fmt_number(*n, f),
			Value::String(s) => f.write_str(s),
			Value::List(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					if *item != Value::Null {
						Display::fmt(item, f)?;
					}
				}
				Ok(())
			}
			Value::Map(_) => f.write_str("[object Object]"),
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}

impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Number(f64::from(n))
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_owned())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::List(items.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
			serde_json::Value::Object(map) => Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
		}
	}
}
