use muu_dom::{
	dom,
	registry::Config,
	template::TemplateError,
	Directive, Document, Error, Event, Registry, Value,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};

fn mount_with(registry: &Registry, template: &str) -> (Document, Directive) {
	let document = Document::new();
	let marker = document.create_element("muu");
	document.body().append_child(&marker);
	registry.register_directive("test", template, |_, _| Ok(None));
	let directive = registry.link(&marker, Some("test")).unwrap();
	(document, directive)
}

fn mount(template: &str, data: serde_json::Value) -> (Document, Directive) {
	let (document, directive) = mount_with(&Registry::new(), template);
	directive.update(&Value::from(data)).unwrap();
	(document, directive)
}

fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Event)>) {
	let log = Rc::new(RefCell::new(Vec::new()));
	let make = {
		let log = Rc::clone(&log);
		move |label: &str| -> Box<dyn Fn(&Event)> {
			let log = Rc::clone(&log);
			let label = label.to_owned();
			Box::new(move |event: &Event| log.borrow_mut().push(format!("{}:{}", label, event.kind())))
		}
	};
	(log, make)
}

#[test]
fn update_renders_into_the_root() {
	let (_document, directive) = mount("<p>{{text}}</p>", json!({ "text": "hi" }));
	assert_eq!(directive.root().inner_html(), "<p>hi</p>");
	assert!(directive.root().has_class("muu-isolate"));

	directive.update(&Value::from(json!({ "text": "there" }))).unwrap();
	assert_eq!(directive.root().inner_html(), "<p>there</p>");
}

#[test]
fn update_surfaces_template_errors() {
	let (_document, directive) = mount_with(&Registry::new(), "{{#a}}");
	assert_eq!(
		directive.update(&Value::Null).unwrap_err(),
		Error::Template(TemplateError::UnclosedLoop("a".to_owned()))
	);
}

#[test]
fn aliases_publish_the_native_event() {
	let (_document, directive) = mount(r#"<button data-onclick="save">x</button>"#, json!({}));
	let (log, make) = recorder();
	let _unsubscribe = directive.on("save", make("save"));

	let button = directive.query_selector("button").unwrap().unwrap();
	button.dispatch_event(&Event::new("click"));
	button.dispatch_event(&Event::new("keyup"));
	assert_eq!(*log.borrow(), vec!["save:click".to_owned()]);
}

#[test]
fn aliases_receive_bubbled_events() {
	let (_document, directive) = mount(r#"<div data-onclick="open"><span>x</span></div>"#, json!({}));
	let received = Rc::new(RefCell::new(None));
	let _unsubscribe = directive.on("open", {
		let received = Rc::clone(&received);
		move |event: &Event| *received.borrow_mut() = event.target()
	});

	let span = directive.query_selector("span").unwrap().unwrap();
	span.dispatch_event(&Event::bubbling("click"));
	assert_eq!(*received.borrow(), Some(span));
}

#[test]
fn aliases_follow_the_current_markup() {
	let template = r#"<button{{#on}} data-onclick="{{alias}}"{{/on}}>x</button>"#;
	let (_document, directive) = mount(template, json!({ "on": true, "alias": "a" }));
	let (log, make) = recorder();
	let _a = directive.on("a", make("a"));
	let _b = directive.on("b", make("b"));
	let button = directive.query_selector("button").unwrap().unwrap();

	directive.update(&Value::from(json!({ "on": true, "alias": "b" }))).unwrap();
	button.dispatch_event(&Event::new("click"));
	directive.update(&Value::from(json!({ "on": false }))).unwrap();
	button.dispatch_event(&Event::new("click"));

	assert_eq!(*log.borrow(), vec!["b:click".to_owned()]);
	assert_eq!(button.listener_count("click"), 1);
}

#[test]
fn unsubscribing_removes_only_that_callback() {
	let (_document, directive) = mount(r#"<button data-onclick="go"></button>"#, json!({}));
	let (log, make) = recorder();
	let first = directive.on("go", make("first"));
	let _second = directive.on("go", make("second"));
	let button = directive.query_selector("button").unwrap().unwrap();

	button.dispatch_event(&Event::new("click"));
	first();
	button.dispatch_event(&Event::new("click"));

	assert_eq!(
		*log.borrow(),
		vec!["first:click".to_owned(), "second:click".to_owned(), "second:click".to_owned()]
	);
}

#[test]
fn only_configured_event_types_are_aliased() {
	let (_document, directive) = mount(r#"<p data-onmouseover="hover"></p>"#, json!({}));
	let (log, make) = recorder();
	let _unsubscribe = directive.on("hover", make("default"));
	directive.query_selector("p").unwrap().unwrap().dispatch_event(&Event::new("mouseover"));
	assert!(log.borrow().is_empty());

	let registry = Registry::with_config(Config {
		events: vec!["mouseover".to_owned()],
		..Config::default()
	});
	let (_document, directive) = mount_with(&registry, r#"<p data-onmouseover="hover" data-onclick="click"></p>"#);
	directive.update(&Value::Null).unwrap();
	let _hover = directive.on("hover", make("configured"));
	let _click = directive.on("click", make("configured"));
	let p = directive.query_selector("p").unwrap().unwrap();
	p.dispatch_event(&Event::new("mouseover"));
	p.dispatch_event(&Event::new("click"));
	assert_eq!(*log.borrow(), vec!["configured:mouseover".to_owned()]);
}

#[test]
fn queries_skip_isolated_subtrees() {
	let (_document, directive) = mount(
		r#"<p class="x">a</p><div class="muu-isolate"><p class="x">b</p></div><section><p class="x">c</p></section>"#,
		json!({}),
	);
	let texts: Vec<String> = directive.query_selector_all(".x").unwrap().iter().map(|p| p.text_content()).collect();
	assert_eq!(texts, vec!["a".to_owned(), "c".to_owned()]);
	assert_eq!(directive.query_selector_all("div").unwrap().len(), 1);
	assert!(directive.query_selector("div p").unwrap().is_none());
	assert!(directive.query_selector("[").is_err());
}

#[test]
fn nested_directives_get_parent_updates() {
	let document = Document::new();
	let marker = document.create_element("muu");
	document.body().append_child(&marker);

	let parent_updates = Rc::new(RefCell::new(0));
	let links = Rc::new(RefCell::new(0));
	let registry = Registry::new();
	registry
		.register_directive("outer", r#"<h1>{{title}}</h1><muu type="inner"></muu>"#, |directive, _| {
			directive.update(&Value::map(vec![("title", "first")]))?;
			Ok(None)
		})
		.register_directive("inner", "<p>inner</p>", {
			let parent_updates = Rc::clone(&parent_updates);
			let links = Rc::clone(&links);
			move |directive, element| {
				*links.borrow_mut() += 1;
				directive.update(&Value::Null)?;
				let parent_updates = Rc::clone(&parent_updates);
				let _unsubscribe = dom::on(element, "muu-parent-update", move |_| *parent_updates.borrow_mut() += 1);
				Ok(None)
			}
		});

	let outer = registry.link(&marker, Some("outer")).unwrap();
	assert_eq!(*links.borrow(), 1);
	assert_eq!(*parent_updates.borrow(), 0);

	outer.update(&Value::map(vec![("title", "second")])).unwrap();
	outer.update(&Value::map(vec![("title", "third")])).unwrap();
	assert_eq!(*links.borrow(), 1);
	assert_eq!(*parent_updates.borrow(), 2);
	assert_eq!(
		outer.root().inner_html(),
		r#"<h1>third</h1><muu type="inner" class="muu-isolate muu-initialised"><p>inner</p></muu>"#
	);
}

const FORM: &str = r#"
	<input name="text" value="hello">
	<input name="check" type="checkbox" checked>
	<input name="num" type="number" value="12.5px">
	<input name="choice" type="radio" value="a">
	<input name="choice" type="radio" value="b" checked>
	<input name="unset" type="radio" value="z">
	<textarea name="area">long</textarea>
	<div class="muu-isolate"><input name="hidden" value="nested"></div>
"#;

#[test]
fn get_model_coerces_by_field_type() {
	let (_document, directive) = mount(FORM, json!({}));
	assert_eq!(directive.get_model("text"), Some(Value::from("hello")));
	assert_eq!(directive.get_model("check"), Some(Value::Bool(true)));
	assert_eq!(directive.get_model("num"), Some(Value::Number(12.5)));
	assert_eq!(directive.get_model("choice"), Some(Value::from("b")));
	assert_eq!(directive.get_model("area"), Some(Value::from("long")));
	assert_eq!(directive.get_model("unset"), None);
	assert_eq!(directive.get_model_or("unset", "default"), Value::from("default"));
	assert_eq!(directive.get_model("hidden"), None);
	assert_eq!(directive.get_model_or("missing", 1), Value::from(1));
}

#[test]
fn model_collects_all_named_fields() {
	let (_document, directive) = mount(FORM, json!({}));
	let model = directive.model();
	let expected = Value::from(json!({
		"text": "hello",
		"check": true,
		"num": 12.5,
		"choice": "b",
		"area": "long",
	}));
	assert_eq!(model, expected);
}

#[test]
fn set_model_round_trips() {
	let (_document, directive) = mount(FORM, json!({}));

	directive.set_model("text", "changed").unwrap();
	assert_eq!(directive.get_model("text"), Some(Value::from("changed")));

	directive.set_model("check", false).unwrap();
	assert_eq!(directive.get_model("check"), Some(Value::Bool(false)));

	directive.set_model("choice", "a").unwrap();
	assert_eq!(directive.get_model("choice"), Some(Value::from("a")));
	let checked: Vec<bool> = directive.query_selector_all("[name=choice]").unwrap().iter().map(|o| o.checked()).collect();
	assert_eq!(checked, vec![true, false]);

	directive.set_model("num", 3).unwrap();
	assert_eq!(directive.get_model("num"), Some(Value::Number(3.0)));
}

#[test]
fn set_model_requires_the_field_but_get_model_does_not() {
	let (_document, directive) = mount(FORM, json!({}));
	assert_eq!(directive.get_model("missing"), None);
	assert_eq!(
		directive.set_model("missing", "value").unwrap_err(),
		Error::MissingField("missing".to_owned())
	);
	assert!(directive.set_model("hidden", "x").is_err());
}

#[test]
fn form_state_survives_updates() {
	let (_document, directive) = mount(r#"<input name="q" class="{{cls}}">"#, json!({ "cls": "a" }));
	directive.set_model("q", "typed").unwrap();
	directive.update(&Value::from(json!({ "cls": "b" }))).unwrap();
	assert_eq!(directive.get_model("q"), Some(Value::from("typed")));
	assert!(directive.query_selector("input.b").unwrap().is_some());
}
