use assert_call::call;

use crate::{Store, Subscription};

/// Subscribes to `store` and records each notification as `key=value`.
pub fn record_notifications(store: &Store) -> Subscription {
    store.subscribe(|n| call!("{}={}", n.key(), n.value()))
}
