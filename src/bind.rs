use std::{any::Any, rc::Rc};

use derive_ex::derive_ex;
use parse_display::{Display, FromStr};
use serde_json::Value;

use crate::{
    utils::{is_truthy, teardown, to_text},
    Store, Subscription,
};


/// How a control's value is read and written.
///
/// Resolved once per control when it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "lowercase")]
pub enum ControlKind {
    /// Reads and writes a boolean checked state.
    Checkbox,
    /// Checked when its own value equals the text of the state value.
    /// Writes back its own value.
    Radio,
    /// Reads and writes the control's text.
    Text,
}

impl ControlKind {
    /// Maps an input `type` attribute to a kind. Unknown types are `Text`.
    pub fn from_type(ty: &str) -> Self {
        ty.trim()
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(ControlKind::Text)
    }

    pub fn read(self, control: &impl Control) -> Value {
        match self {
            ControlKind::Checkbox => Value::Bool(control.checked()),
            ControlKind::Radio | ControlKind::Text => Value::String(control.value()),
        }
    }

    pub fn write(self, control: &impl Control, value: Option<&Value>) {
        match self {
            ControlKind::Checkbox => control.set_checked(is_truthy(value)),
            ControlKind::Radio => {
                let checked = to_text(value).is_some_and(|text| control.value() == text);
                control.set_checked(checked)
            }
            ControlKind::Text => control.set_value(&to_text(value).unwrap_or_default()),
        }
    }
}

/// A subtree that can be searched for controls.
pub trait Element {
    type Control: Control;

    /// Returns the descendants matching `selector`, in document order.
    ///
    /// A selector that matches nothing, or cannot be parsed, yields an empty list.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Control>;
}

/// A form control that can be bound to a store key.
///
/// The setters must not dispatch events.
pub trait Control: 'static {
    fn kind(&self) -> ControlKind;
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
    fn checked(&self) -> bool;
    fn set_checked(&self, checked: bool);

    /// Calls `f` each time `event` is dispatched on this control until the
    /// returned subscription is unsubscribed.
    fn listen(&self, event: &str, f: Rc<dyn Fn()>) -> Subscription;
}

/// Selector to store key declarations for [`bind`].
///
/// Several selectors may map to one key. Inserting a selector that is already
/// present replaces its key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingMap(Vec<(String, String)>);

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, selector: impl Into<String>, key: impl Into<String>) {
        let selector = selector.into();
        let key = key.into();
        if let Some(entry) = self.0.iter_mut().find(|(s, _)| *s == selector) {
            entry.1 = key;
        } else {
            self.0.push((selector, key));
        }
    }
    pub fn with(mut self, selector: impl Into<String>, key: impl Into<String>) -> Self {
        self.insert(selector, key);
        self
    }
    pub fn get(&self, selector: &str) -> Option<&str> {
        self.iter().find(|(s, _)| *s == selector).map(|(_, k)| k)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, k)| (s.as_str(), k.as_str()))
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(_, k)| k == key)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<S: Into<String>, K: Into<String>> FromIterator<(S, K)> for BindingMap {
    fn from_iter<I: IntoIterator<Item = (S, K)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (selector, key) in iter {
            map.insert(selector, key);
        }
        map
    }
}
impl<S: Into<String>, K: Into<String>, const N: usize> From<[(S, K); N]> for BindingMap {
    fn from(entries: [(S, K); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Options for [`bind_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive_ex(Default)]
pub struct BindOptions {
    /// Events that copy a control's value into the store.
    #[default(vec!["input".to_string(), "change".to_string()])]
    pub events: Vec<String>,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events<I>(mut self, events: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }
}

/// Binds the controls under `element` to `store` with the default options.
///
/// See [`bind_with`].
pub fn bind<E: Element>(element: &E, store: &Store, map: &BindingMap) -> Binding {
    bind_with(element, store, map, &BindOptions::default())
}

/// Two-way binds the controls under `element` to keys of `store`.
///
/// Every control matched by a selector in `map` is set from the store right
/// away, writes its value into the store on each of `options.events`, and is
/// updated whenever its key changes in the store.
///
/// Only controls present when `bind_with` is called are bound.
pub fn bind_with<E: Element>(
    element: &E,
    store: &Store,
    map: &BindingMap,
    options: &BindOptions,
) -> Binding {
    let mut controls = Vec::new();
    let mut subscriptions = Vec::new();
    for (selector, key) in map.iter() {
        let matched = element.query_selector_all(selector);
        if matched.is_empty() {
            tracing::debug!(selector, "selector matched no controls");
        }
        for control in matched {
            let bound = Rc::new(BoundControl {
                kind: control.kind(),
                control,
                key: key.to_string(),
            });
            bound.write(store.get(key).as_ref());

            let weak = Rc::downgrade(&bound);
            let store = store.clone();
            let f: Rc<dyn Fn()> = Rc::new(move || {
                if let Some(bound) = weak.upgrade() {
                    store.set(bound.key.clone(), bound.read());
                }
            });
            for event in &options.events {
                subscriptions.push(bound.control.listen(event, f.clone()));
            }
            controls.push(bound);
        }
    }
    let controls = Rc::new(controls);
    let weak = Rc::downgrade(&controls);
    subscriptions.push(store.subscribe(move |n| {
        let Some(controls) = weak.upgrade() else {
            return;
        };
        for bound in controls.iter().filter(|c| c.key == n.key()) {
            bound.write(Some(n.value()));
        }
    }));
    tracing::debug!(
        selectors = map.len(),
        controls = controls.len(),
        "bound controls"
    );
    Binding {
        bound: controls.len(),
        controls: Some(controls),
        subscriptions,
    }
}

struct BoundControl<C> {
    control: C,
    kind: ControlKind,
    key: String,
}
impl<C: Control> BoundControl<C> {
    fn read(&self) -> Value {
        self.kind.read(&self.control)
    }
    fn write(&self, value: Option<&Value>) {
        self.kind.write(&self.control, value)
    }
}

/// Handle returned by [`bind`].
///
/// Dropping it has the same effect as [`unbind`](Self::unbind).
#[must_use]
pub struct Binding {
    bound: usize,
    controls: Option<Rc<dyn Any>>,
    subscriptions: Vec<Subscription>,
}

impl Binding {
    /// Removes every listener installed by [`bind`], on the controls and on the
    /// store.
    ///
    /// Calling this more than once has no further effect.
    pub fn unbind(&mut self) {
        if self.controls.is_none() {
            return;
        }
        for mut s in self.subscriptions.drain(..) {
            teardown(move || s.unsubscribe());
        }
        self.controls = None;
        tracing::debug!(controls = self.bound, "unbound controls");
    }

    /// Returns `true` until [`unbind`](Self::unbind) is called.
    pub fn is_bound(&self) -> bool {
        self.controls.is_some()
    }

    /// Number of controls that were matched when binding.
    pub fn bound_controls(&self) -> usize {
        self.bound
    }
}
impl Drop for Binding {
    fn drop(&mut self) {
        self.unbind();
    }
}
impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("bound", &self.bound)
            .field("is_bound", &self.is_bound())
            .finish()
    }
}
