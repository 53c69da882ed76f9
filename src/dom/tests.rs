use assert_call::{call, CallRecorder};
use rstest::rstest;

use super::*;

fn form() -> Node {
    Node::new("form")
        .with_attr("id", "profile")
        .with_child(
            Node::new("fieldset")
                .with_attr("class", "person main")
                .with_child(Node::input("text").with_attr("name", "name"))
                .with_child(Node::input("email").with_attr("name", "email")),
        )
        .with_child(Node::input("checkbox").with_attr("name", "subscribe"))
        .with_child(
            Node::input("radio")
                .with_attr("name", "plan")
                .with_attr("value", "free"),
        )
        .with_child(
            Node::input("radio")
                .with_attr("name", "plan")
                .with_attr("value", "pro"),
        )
        .with_child(Node::new("textarea").with_attr("id", "bio"))
}

#[rstest]
#[case("input", 5)]
#[case("input[name=name]", 1)]
#[case("input[name='plan']", 2)]
#[case("input[name=\"plan\"][value=pro]", 1)]
#[case("[type]", 5)]
#[case("#bio", 1)]
#[case("textarea#bio", 1)]
#[case(".person input", 2)]
#[case(".person.main > input", 2)]
#[case("form > input", 3)]
#[case("fieldset > [name=subscribe]", 0)]
#[case("#profile input[type=text]", 1)]
#[case("#bio, input[type=checkbox]", 2)]
#[case("*", 7)]
#[case("select", 0)]
#[case("INPUT[name=name]", 1)]
fn query_selector_all(#[case] selector: &str, #[case] count: usize) {
    assert_eq!(form().query_selector_all(selector).len(), count);
}

#[rstest]
#[case("")]
#[case("input[")]
#[case("input[name=]")]
#[case("input >")]
#[case("input[name='x]")]
#[case("a,,b")]
#[case("input!")]
fn invalid_selector(#[case] selector: &str) {
    let root = form();
    assert!(root.try_query_selector_all(selector).is_err());
    assert!(root.query_selector_all(selector).is_empty());
}

#[test]
fn document_order() {
    let names: Vec<_> = form()
        .query_selector_all("input")
        .iter()
        .map(|n| n.attr("name").unwrap())
        .collect();
    assert_eq!(names, ["name", "email", "subscribe", "plan", "plan"]);
}

#[test]
fn ancestors_outside_root_take_part_in_matching() {
    let root = form();
    let fieldset = root.query_selector("fieldset").unwrap();
    assert_eq!(fieldset.query_selector_all("form input").len(), 2);
}

#[test]
fn value_attribute_sets_value() {
    let n = Node::input("text").with_attr("value", "Ada");
    assert_eq!(n.value(), "Ada");
    n.set_value("Grace");
    assert_eq!(n.value(), "Grace");
    assert_eq!(n.attr("value").as_deref(), Some("Ada"));
}

#[test]
fn append_child_moves_node() {
    let a = Node::new("div");
    let b = Node::new("div");
    let child = Node::new("span");
    a.append_child(&child);
    b.append_child(&child);
    assert!(a.children().is_empty());
    assert_eq!(b.children(), [child.clone()]);
    assert_eq!(child.parent(), Some(b));
}

#[test]
fn kind_from_type() {
    assert_eq!(Node::input("checkbox").kind(), ControlKind::Checkbox);
    assert_eq!(Node::input("Radio").kind(), ControlKind::Radio);
    assert_eq!(Node::input("number").kind(), ControlKind::Text);
    assert_eq!(Node::new("input").kind(), ControlKind::Text);
    assert_eq!(
        Node::new("select").with_attr("type", "checkbox").kind(),
        ControlKind::Text
    );
}

#[test]
fn radio_group_is_exclusive() {
    let root = form();
    let radios = root.query_selector_all("[name=plan]");
    radios[0].set_checked(true);
    radios[1].set_checked(true);
    assert!(!radios[0].checked());
    assert!(radios[1].checked());
}

#[test]
fn dispatch_calls_matching_listeners() {
    let mut cr = CallRecorder::new();
    let n = Node::input("text");
    let _a = n.add_event_listener("input", || call!("a"));
    let _b = n.add_event_listener("change", || call!("b"));
    n.dispatch("input");
    cr.verify("a");
    n.input_text("x");
    cr.verify(["a", "b"]);
}

#[test]
fn listener_removed_on_unsubscribe() {
    let mut cr = CallRecorder::new();
    let n = Node::input("text");
    let mut s = n.add_event_listener("input", || call!("a"));
    assert_eq!(n.listener_count(), 1);
    s.unsubscribe();
    s.unsubscribe();
    assert_eq!(n.listener_count(), 0);
    n.dispatch("input");
    cr.verify(());
}

#[test]
fn listener_removed_during_dispatch_is_skipped() {
    let mut cr = CallRecorder::new();
    let n = Node::input("text");
    let later: std::rc::Rc<std::cell::RefCell<Option<crate::Subscription>>> =
        Default::default();
    let later0 = later.clone();
    let _a = n.add_event_listener("input", move || {
        call!("a");
        if let Some(mut s) = later0.borrow_mut().take() {
            s.unsubscribe();
        }
    });
    *later.borrow_mut() = Some(n.add_event_listener("input", || call!("b")));
    n.dispatch("input");
    cr.verify("a");
    assert_eq!(n.listener_count(), 1);
}

#[test]
fn panicking_listener_does_not_stop_dispatch() {
    let mut cr = CallRecorder::new();
    let n = Node::input("text");
    let _a = n.add_event_listener("input", || panic!("listener failed"));
    let _b = n.add_event_listener("input", || call!("b"));
    n.dispatch("input");
    cr.verify("b");
}

#[test]
fn click_fires_on_change_only() {
    let mut cr = CallRecorder::new();
    let radio = Node::input("radio").with_attr("value", "a");
    let _s = radio.add_event_listener("change", || call!("change"));
    radio.click();
    cr.verify("change");
    radio.click();
    cr.verify(());

    let checkbox = Node::input("checkbox");
    let _s = checkbox.add_event_listener("change", || call!("change"));
    checkbox.click();
    assert!(checkbox.checked());
    checkbox.click();
    assert!(!checkbox.checked());
    cr.verify(["change", "change"]);
}

#[test]
fn debug_format() {
    let n = Node::input("text").with_attr("name", "name");
    assert_eq!(format!("{n:?}"), r#"<input type="text" name="name">"#);
}
