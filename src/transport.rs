use std::{cell::RefCell, rc::Rc};

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slabmap::SlabMap;

use crate::{utils::call_listener, Subscription};

#[cfg(test)]
mod tests;

/// A published message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(topic: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
        }
    }
}

/// Publish/subscribe endpoint.
///
/// Topic patterns: `*` matches every topic, `prefix.*` matches topics that
/// start with `prefix.`, anything else matches one topic exactly.
pub trait Transport {
    fn subscribe(&self, pattern: &str, f: Rc<dyn Fn(&Message)>) -> Subscription;
    fn publish(&self, message: Message);
}

/// Returns `true` if `topic` matches `pattern`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('.') => topic.starts_with(prefix),
        _ => pattern == topic,
    }
}

/// In-process, single-threaded [`Transport`].
///
/// Handlers run synchronously inside [`publish`](Transport::publish). A
/// panicking handler is logged and the remaining handlers still run.
#[derive_ex(Clone, Default)]
#[default(Self::new())]
pub struct LocalBus(Rc<BusNode>);

struct BusNode {
    handlers: RefCell<SlabMap<(String, Rc<dyn Fn(&Message)>)>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self(Rc::new(BusNode {
            handlers: RefCell::new(SlabMap::new()),
        }))
    }

    pub fn on(&self, pattern: &str, f: impl Fn(&Message) + 'static) -> Subscription {
        self.subscribe(pattern, Rc::new(f))
    }

    pub fn handler_count(&self) -> usize {
        self.0.handlers.borrow().len()
    }
}
impl Transport for LocalBus {
    fn subscribe(&self, pattern: &str, f: Rc<dyn Fn(&Message)>) -> Subscription {
        let id = self
            .0
            .handlers
            .borrow_mut()
            .insert((pattern.to_string(), f));
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<BusNode>| {
            node.handlers.borrow_mut().remove(id);
        })
    }

    fn publish(&self, message: Message) {
        let handlers: Vec<_> = self
            .0
            .handlers
            .borrow()
            .values()
            .filter(|(pattern, _)| topic_matches(pattern, &message.topic))
            .map(|(_, f)| f.clone())
            .collect();
        tracing::trace!(topic = %message.topic, handlers = handlers.len(), "publish");
        for f in handlers {
            call_listener(&message.topic, || f(&message));
        }
    }
}
impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
