use muu_dom::{
	diff::{reconcile, reconcile_children, reconcile_html},
	Document, Node,
};
use proptest::prelude::*;

fn mounted(html: &str) -> (Document, Node) {
	let document = Document::new();
	let container = document.create_element("div");
	document.body().append_child(&container);
	container.set_inner_html(html);
	(document, container)
}

fn detached(html: &str) -> Node {
	let node = Node::element("div");
	node.set_inner_html(html);
	node
}

#[test]
fn adds_and_removes_children() {
	let (_document, container) = mounted("<p>a</p>");
	reconcile_html(&container, "<p>a</p><p>b</p><!--c-->");
	assert_eq!(container.inner_html(), "<p>a</p><p>b</p><!--c-->");

	reconcile_html(&container, "<p>a</p>");
	assert_eq!(container.inner_html(), "<p>a</p>");

	reconcile_html(&container, "");
	assert_eq!(container.child_count(), 0);
}

#[test]
fn replaces_mismatching_nodes() {
	let (_document, container) = mounted("<p>a</p><span>b</span>");
	let kept = container.child(0).unwrap();
	let replaced = container.child(1).unwrap();

	reconcile_html(&container, "<p>x</p><em>b</em>");
	assert_eq!(container.inner_html(), "<p>x</p><em>b</em>");
	assert_eq!(container.child(0).unwrap(), kept);
	assert_ne!(container.child(1).unwrap(), replaced);
	assert!(replaced.parent().is_none());
}

#[test]
fn text_and_element_are_different_nodes() {
	let (_document, container) = mounted("text");
	reconcile_html(&container, "<b>text</b>");
	assert_eq!(container.inner_html(), "<b>text</b>");
}

#[test]
fn synchronises_attributes() {
	let (_document, container) = mounted(r#"<a href="/old" title="t">x</a>"#);
	reconcile_html(&container, r#"<a href="/new" rel="next">x</a>"#);
	let a = container.child(0).unwrap();
	assert_eq!(a.attribute("href").as_deref(), Some("/new"));
	assert_eq!(a.attribute("rel").as_deref(), Some("next"));
	assert!(!a.has_attribute("title"));
}

#[test]
fn preserves_muu_classes() {
	let target = detached(r#"<span class="muu-x">old</span>"#);
	let source = detached(r#"<span class="test">old</span>"#);
	reconcile(&target, &source);
	let span = target.child(0).unwrap();
	let mut classes = span.classes();
	classes.sort();
	assert_eq!(classes, vec!["muu-x".to_owned(), "test".to_owned()]);
}

#[test]
fn preserves_muu_classes_without_source_class() {
	let (_document, container) = mounted(r#"<span class="muu-x other">old</span>"#);
	reconcile_html(&container, "<span>old</span>");
	assert_eq!(container.child(0).unwrap().attribute("class").as_deref(), Some("muu-x"));
}

#[test]
fn preserves_input_state_on_kept_nodes() {
	let (_document, container) = mounted(r#"<input><input type="checkbox">"#);
	let text = container.child(0).unwrap();
	let checkbox = container.child(1).unwrap();
	text.set_value("1");
	checkbox.set_checked(true);

	reconcile_html(&container, r#"<input class="test"><input type="checkbox" class="test">"#);
	assert_eq!(container.child(0).unwrap(), text);
	assert_eq!(text.value(), "1");
	assert!(text.has_class("test"));
	assert!(checkbox.checked());
}

#[test]
fn input_type_change_replaces_the_node() {
	let (_document, container) = mounted(r#"<input type="text">"#);
	let old = container.child(0).unwrap();
	old.set_value("typed");

	reconcile_html(&container, r#"<input type="checkbox">"#);
	let new = container.child(0).unwrap();
	assert_ne!(new, old);
	assert_eq!(new.value(), "");
}

#[test]
fn does_not_descend_into_isolated_elements() {
	let target = detached(r#"<div class="muu-isolate" title="a"><div>haha</div></div>"#);
	let source = detached(r#"<div class="muu-isolate" title="b"><span>huhu</span></div>"#);
	reconcile(&target, &source);

	let isolated = target.child(0).unwrap();
	assert_eq!(isolated.inner_html(), "<div>haha</div>");
	assert_eq!(isolated.attribute("title").as_deref(), Some("b"));
}

#[test]
fn isolation_class_is_read_from_the_target() {
	let (_document, container) = mounted(r#"<muu class="muu-isolate muu-initialised"><p>nested</p></muu>"#);
	reconcile_html(&container, "<muu></muu>");
	let marker = container.child(0).unwrap();
	assert_eq!(marker.inner_html(), "<p>nested</p>");
	assert!(marker.has_class("muu-initialised"));
}

#[test]
fn second_reconcile_is_a_no_op() {
	let html = r#"<ul class="list"><li class="a">1</li><li>2 &amp; 3</li></ul><input type="number" value="4"><br>tail"#;
	let (document, container) = mounted("<p>before</p>");

	reconcile_html(&container, html);
	let after_first = document.mutation_count();
	let markup = container.inner_html();

	reconcile_html(&container, html);
	assert_eq!(document.mutation_count(), after_first);
	assert_eq!(container.inner_html(), markup);
}

fn fragment() -> impl Strategy<Value = String> {
	let leaf = prop_oneof![
		"[a-z &]{1,6}",
		Just("1 &lt; 2".to_owned()),
		Just("<br>".to_owned()),
		Just(r#"<input type="checkbox" checked>"#.to_owned()),
		Just(r#"<input name="n" value="v">"#.to_owned()),
		"[a-z]{0,4}".prop_map(|text| format!("<!--{}-->", text)),
	];
	leaf.prop_recursive(4, 32, 4, |inner| {
		(
			prop::sample::select(vec!["p", "span", "li", "muu"]),
			prop::option::of("[a-z]{1,3}"),
			prop::collection::vec(inner, 0..4),
		)
			.prop_map(|(tag, class, children)| {
				let class = class.map(|class| format!(r#" class="{}""#, class)).unwrap_or_default();
				format!("<{0}{1}>{2}</{0}>", tag, class, children.concat())
			})
	})
}

proptest! {
	#[test]
	fn reconciling_twice_changes_nothing_the_second_time(
		before in prop::collection::vec(fragment(), 0..4),
		after in prop::collection::vec(fragment(), 0..4),
	) {
		let (document, container) = mounted(&before.concat());
		let html = after.concat();

		reconcile_html(&container, &html);
		let after_first = document.mutation_count();
		let markup = container.inner_html();

		reconcile_html(&container, &html);
		prop_assert_eq!(document.mutation_count(), after_first);
		prop_assert_eq!(container.inner_html(), markup);
	}
}

#[test]
fn mutations_of_detached_trees_are_not_counted() {
	let document = Document::new();
	let loose = document.create_element("div");
	loose.set_inner_html("<p>x</p>");
	reconcile_html(&loose, "<p>y</p>");
	assert_eq!(document.mutation_count(), 0);
}

#[test]
fn reconcile_children_leaves_the_target_alone() {
	let target = detached("<p>a</p>");
	target.set_attribute("id", "keep");
	let source = Node::element("section");
	source.set_inner_html("<p>b</p>");

	reconcile_children(&target, &source);
	assert_eq!(target.outer_html(), r#"<div id="keep"><p>b</p></div>"#);
}

/// Matching is positional, so state follows the position rather than the item.
#[test]
fn reordering_shifts_state_to_the_old_position() {
	let (_document, container) = mounted(r#"<input name="a"><input name="b">"#);
	let first = container.child(0).unwrap();
	first.set_value("typed into a");

	reconcile_html(&container, r#"<input name="b"><input name="a">"#);
	assert_eq!(container.child(0).unwrap(), first);
	assert_eq!(first.attribute("name").as_deref(), Some("b"));
	assert_eq!(first.value(), "typed into a");
	assert_eq!(container.child(1).unwrap().value(), "");
}
