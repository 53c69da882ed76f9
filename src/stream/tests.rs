use futures::{executor::block_on, StreamExt};
use serde_json::json;

use crate::Store;

#[test]
fn queued_notifications() {
    let s = Store::new(json!({ "a": 0 })).unwrap();
    let mut stream = s.notifications();
    s.set("a", 1);
    s.set("a", 1);
    s.set("b", "x");
    assert_eq!(stream.pending(), 2);

    let n = block_on(stream.next()).unwrap();
    assert_eq!((n.key(), n.value()), ("a", &json!(1)));
    let n = block_on(stream.next()).unwrap();
    assert_eq!((n.key(), n.value()), ("b", &json!("x")));
    assert_eq!(stream.pending(), 0);
}

#[test]
fn drop_unsubscribes() {
    let s = Store::default();
    let stream = s.notifications();
    assert_eq!(s.subscriber_count(), 1);
    drop(stream);
    assert_eq!(s.subscriber_count(), 0);
}

#[test]
fn pending_until_write() {
    let s = Store::default();
    let mut stream = s.notifications();
    let waker = futures::task::noop_waker();
    let mut cx = std::task::Context::from_waker(&waker);
    assert!(stream.poll_next_unpin(&mut cx).is_pending());
    s.set("a", true);
    assert!(stream.poll_next_unpin(&mut cx).is_ready());
}

#[test]
fn unpolled_stream_keeps_every_notification() {
    let s = Store::new(json!({ "a": 0 })).unwrap();
    let mut stream = s.notifications();
    for i in 1..=100 {
        s.set("a", i);
    }
    assert_eq!(stream.pending(), 100);
    let n = block_on(stream.next()).unwrap();
    assert_eq!(n.value(), &json!(1));
    assert_eq!(stream.pending(), 99);
}
