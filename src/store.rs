use std::{
    cell::RefCell,
    collections::VecDeque,
    mem::take,
    rc::Rc,
    thread::panicking,
};

use derive_ex::derive_ex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use slabmap::SlabMap;

use crate::{
    utils::{call_listener, value_kind},
    Error, Result, Subscription,
};


/// The state held by a [`Store`]: a flat map from key to JSON value.
pub type StateMap = Map<String, Value>;

type Callback = Rc<dyn Fn(&Notification)>;

/// Observable key/value state.
///
/// Every write goes through [`set`](Self::set), [`patch`](Self::patch),
/// [`update`](Self::update) or [`batch`](Self::batch). A write that changes a
/// value notifies every subscriber synchronously; a write of an equal value is
/// ignored.
///
/// `Store` is a cheap handle. Clones share the same state.
#[derive_ex(Clone, Default)]
#[default(Self::from_map(StateMap::new()))]
pub struct Store(Rc<StoreNode>);

impl Store {
    /// Creates a store from any value that serializes to a JSON object.
    pub fn new(initial: impl Serialize) -> Result<Self> {
        match serde_json::to_value(initial)? {
            Value::Object(state) => Ok(Self::from_map(state)),
            value => Err(Error::NotAnObject {
                found: value_kind(&value),
            }),
        }
    }

    /// Creates a store that owns `state`.
    pub fn from_map(state: StateMap) -> Self {
        Self(Rc::new(StoreNode {
            state: RefCell::new(state),
            subscribers: RefCell::new(SlabMap::new()),
            batch: RefCell::new(BatchState::default()),
        }))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.state.borrow().get(key).cloned()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.state.borrow().contains_key(key)
    }
    pub fn keys(&self) -> Vec<String> {
        self.0.state.borrow().keys().cloned().collect()
    }
    pub fn len(&self) -> usize {
        self.0.state.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.state.borrow().is_empty()
    }

    /// Returns a deep copy of the current state.
    ///
    /// Changing the returned map never affects the store.
    pub fn snapshot(&self) -> StateMap {
        self.0.state.borrow().clone()
    }

    /// Writes `value` at `key` and notifies subscribers if the value changed.
    ///
    /// Inside a [`batch`](Self::batch) the notification is deferred until the
    /// outermost batch ends.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let old = {
            let mut state = self.0.state.borrow_mut();
            if state.get(&key) == Some(&value) {
                return;
            }
            state.insert(key.clone(), value.clone())
        };
        tracing::trace!(key = %key, "state changed");
        {
            let mut batch = self.0.batch.borrow_mut();
            if batch.depth > 0 {
                batch.record(key, old);
                return;
            }
        }
        self.notify(key, value);
    }

    /// Applies every entry of `partial` as one batch.
    ///
    /// Subscribers are notified once per changed key, after all entries are
    /// applied.
    pub fn patch(&self, partial: StateMap) {
        self.batch(|| {
            for (key, value) in partial {
                self.set(key, value);
            }
        })
    }

    /// Like [`patch`](Self::patch), but accepts any value that serializes to a
    /// JSON object.
    pub fn patch_from(&self, partial: impl Serialize) -> Result<()> {
        match serde_json::to_value(partial)? {
            Value::Object(partial) => {
                self.patch(partial);
                Ok(())
            }
            value => Err(Error::NotAnObject {
                found: value_kind(&value),
            }),
        }
    }

    /// Read-modify-write.
    ///
    /// `f` receives a snapshot and returns the next state. Returning `None`
    /// patches the snapshot it was given. Keys missing from the result are left
    /// untouched.
    pub fn update(&self, f: impl FnOnce(StateMap) -> Option<StateMap>) {
        self.batch(|| {
            let current = self.snapshot();
            let next = f(current.clone()).unwrap_or(current);
            self.patch(next);
        })
    }

    /// Fallible [`update`](Self::update).
    ///
    /// If `f` fails, the batch is closed and the error is returned as
    /// [`Error::Transform`]. Writes made through the store inside `f` stay
    /// applied and are notified.
    pub fn try_update<E>(
        &self,
        f: impl FnOnce(StateMap) -> Result<Option<StateMap>, E>,
    ) -> Result<()>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.batch(|| -> Result<()> {
            let current = self.snapshot();
            let next = f(current.clone()).map_err(|e| Error::Transform(e.into()))?;
            self.patch(next.unwrap_or(current));
            Ok(())
        })
    }

    /// Runs `f` with notifications deferred.
    ///
    /// When the outermost batch ends, each key changed inside it is notified
    /// once with its final value, in the order the keys were first written. A
    /// key written back to its value from before the batch is not notified.
    ///
    /// If `f` panics, every key written inside the outermost batch is restored
    /// to its value from before the batch and nothing is notified.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = BatchGuard::new(self);
        f()
    }

    /// Returns `true` while a batch is open.
    pub fn is_batching(&self) -> bool {
        self.0.batch.borrow().depth > 0
    }

    /// Registers `f` to receive every future notification.
    pub fn subscribe(&self, f: impl Fn(&Notification) + 'static) -> Subscription {
        let id = self.0.subscribers.borrow_mut().insert(Rc::new(f));
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<StoreNode>| {
            node.subscribers.borrow_mut().remove(id);
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.borrow().len()
    }

    fn notify(&self, key: String, value: Value) {
        self.0.batch.borrow_mut().mark_notified(&key, &value);
        let callbacks: Vec<(usize, Callback)> = self
            .0
            .subscribers
            .borrow()
            .iter()
            .map(|(id, f)| (id, f.clone()))
            .collect();
        let n = Notification {
            key,
            value,
            store: self.clone(),
        };
        for (id, f) in callbacks {
            if !self.0.is_subscribed(id, &f) {
                continue;
            }
            call_listener(&n.key, || f(&n));
        }
    }

    fn flush(&self, pending: Vec<(String, Option<Value>)>) {
        tracing::trace!(keys = pending.len(), "batch closed");
        let count = pending.len();
        {
            // Batches closed by subscribers stack their keys in front.
            let mut batch = self.0.batch.borrow_mut();
            for entry in pending.into_iter().rev() {
                batch.flushing.push_front(entry);
            }
        }
        for _ in 0..count {
            let next = self.0.batch.borrow_mut().flushing.pop_front();
            let Some((key, before)) = next else {
                break;
            };
            let Some(value) = self.get(&key) else {
                continue;
            };
            if before.as_ref() != Some(&value) {
                self.notify(key, value);
            }
        }
    }
}
impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.state.try_borrow() {
            Ok(state) => std::fmt::Debug::fmt(&*state, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
impl Serialize for Store {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.state.try_borrow() {
            Ok(state) => state.serialize(serializer),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}

struct StoreNode {
    state: RefCell<StateMap>,
    subscribers: RefCell<SlabMap<Callback>>,
    batch: RefCell<BatchState>,
}
impl StoreNode {
    fn is_subscribed(&self, id: usize, f: &Callback) -> bool {
        self.subscribers
            .borrow()
            .get(id)
            .is_some_and(|g| Rc::ptr_eq(f, g))
    }

    fn rollback(&self, pending: Vec<(String, Option<Value>)>) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::error!(
                keys = pending.len(),
                "batch aborted by panic, state is borrowed"
            );
            return;
        };
        tracing::warn!(keys = pending.len(), "batch aborted by panic, rolled back");
        for (key, before) in pending {
            match before {
                Some(value) => {
                    state.insert(key, value);
                }
                None => {
                    state.remove(&key);
                }
            }
        }
    }
}

#[derive(Default)]
struct BatchState {
    depth: usize,
    /// Keys written in the open batch with their value from before it.
    pending: Vec<(String, Option<Value>)>,
    /// Keys of a closed batch not yet notified, with the last value
    /// subscribers have seen.
    flushing: VecDeque<(String, Option<Value>)>,
}
impl BatchState {
    fn record(&mut self, key: String, old: Option<Value>) {
        if !self.pending.iter().any(|(k, _)| *k == key) {
            self.pending.push((key, old));
        }
    }
    fn mark_notified(&mut self, key: &str, value: &Value) {
        for (k, seen) in &mut self.flushing {
            if k == key {
                *seen = Some(value.clone());
            }
        }
    }
}

struct BatchGuard<'a>(&'a Store);

impl<'a> BatchGuard<'a> {
    fn new(store: &'a Store) -> Self {
        store.0.batch.borrow_mut().depth += 1;
        Self(store)
    }
}
impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let pending = {
            let mut batch = self.0 .0.batch.borrow_mut();
            batch.depth -= 1;
            if batch.depth > 0 {
                return;
            }
            take(&mut batch.pending)
        };
        if panicking() {
            self.0 .0.rollback(pending);
            return;
        }
        self.0.flush(pending);
    }
}

/// A single effective write.
#[derive(Clone)]
pub struct Notification {
    key: String,
    value: Value,
    store: Store,
}

impl Notification {
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The store that changed, for reading the full current state.
    pub fn state(&self) -> &Store {
        &self.store
    }
}
impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
