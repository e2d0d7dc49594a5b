#![doc(html_root_url = "https://docs.rs/muu-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod diff;
pub mod directive;
pub mod dom;
mod error;
#[cfg(feature = "web")]
pub mod load;
pub mod registry;
pub mod template;
mod value;

pub use diff::reconcile;
pub use directive::Directive;
pub use dom::{Document, Event, Node};
pub use error::Error;
pub use registry::{Config, Registry};
pub use template::render;
pub use value::Value;
