use assert_call::{call, CallRecorder};
use rstest::rstest;
use serde_json::json;

use super::*;

#[rstest]
#[case("*", "anything", true)]
#[case("user.*", "user.saved", true)]
#[case("user.*", "user", false)]
#[case("user.*", "users.saved", false)]
#[case("user.saved", "user.saved", true)]
#[case("user.saved", "user.deleted", false)]
#[case("user*", "user*", true)]
#[case("user*", "users", false)]
fn topic_patterns(#[case] pattern: &str, #[case] topic: &str, #[case] expected: bool) {
    assert_eq!(topic_matches(pattern, topic), expected);
}

#[test]
fn publish_reaches_matching_handlers() {
    let mut cr = CallRecorder::new();
    let bus = LocalBus::new();
    let _all = bus.on("*", |m| call!("all {}", m.topic));
    let _user = bus.on("user.*", |m| call!("user {}", m.data));
    bus.publish(Message::new("user.saved", json!({ "id": 1 })));
    cr.verify(["all user.saved", "user {\"id\":1}"]);
    bus.publish(Message::new("cart.cleared", json!(null)));
    cr.verify("all cart.cleared");
}

#[test]
fn unsubscribe_stops_delivery() {
    let mut cr = CallRecorder::new();
    let bus = LocalBus::new();
    let mut s = bus.on("*", |m| call!("{}", m.topic));
    s.unsubscribe();
    s.unsubscribe();
    assert_eq!(bus.handler_count(), 0);
    bus.publish(Message::new("x", 1));
    cr.verify(());
}

#[test]
fn panicking_handler_is_isolated() {
    let mut cr = CallRecorder::new();
    let bus = LocalBus::new();
    let _a = bus.on("*", |_| panic!("handler failed"));
    let _b = bus.on("*", |m| call!("{}", m.topic));
    bus.publish(Message::new("x", 1));
    cr.verify("x");
}

#[test]
fn message_serde() {
    let m: Message = serde_json::from_value(json!({ "topic": "ping" })).unwrap();
    assert_eq!(m, Message::new("ping", json!(null)));
    assert_eq!(
        serde_json::to_value(Message::new("a", "b")).unwrap(),
        json!({ "topic": "a", "data": "b" })
    );
}
