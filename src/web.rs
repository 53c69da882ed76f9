//! Browser host, enabled by the `web` feature.
//!
//! `web_sys::Element` is an [`Element`](crate::Element) whose matches are
//! wrapped in [`WebControl`]. Inputs, text areas and selects are read and
//! written through their `value` property; any other element through its text
//! content.

use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

use crate::{Control, ControlKind, Element, Subscription};

impl Element for web_sys::Element {
    type Control = WebControl;

    fn query_selector_all(&self, selector: &str) -> Vec<WebControl> {
        let list = match web_sys::Element::query_selector_all(self, selector) {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!(selector, error = ?e, "ignoring selector");
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .map(WebControl)
            .collect()
    }
}

/// A DOM element bound as a control.
#[derive(Debug, Clone, PartialEq)]
pub struct WebControl(pub web_sys::Element);

impl Control for WebControl {
    fn kind(&self) -> ControlKind {
        match self.0.dyn_ref::<HtmlInputElement>() {
            Some(input) => ControlKind::from_type(&input.type_()),
            None => ControlKind::Text,
        }
    }
    fn value(&self) -> String {
        if let Some(e) = self.0.dyn_ref::<HtmlInputElement>() {
            e.value()
        } else if let Some(e) = self.0.dyn_ref::<HtmlTextAreaElement>() {
            e.value()
        } else if let Some(e) = self.0.dyn_ref::<HtmlSelectElement>() {
            e.value()
        } else {
            self.0.text_content().unwrap_or_default()
        }
    }
    fn set_value(&self, value: &str) {
        if let Some(e) = self.0.dyn_ref::<HtmlInputElement>() {
            e.set_value(value)
        } else if let Some(e) = self.0.dyn_ref::<HtmlTextAreaElement>() {
            e.set_value(value)
        } else if let Some(e) = self.0.dyn_ref::<HtmlSelectElement>() {
            e.set_value(value)
        } else {
            self.0.set_text_content(Some(value))
        }
    }
    fn checked(&self) -> bool {
        self.0
            .dyn_ref::<HtmlInputElement>()
            .is_some_and(|e| e.checked())
    }
    fn set_checked(&self, checked: bool) {
        if let Some(e) = self.0.dyn_ref::<HtmlInputElement>() {
            e.set_checked(checked)
        }
    }

    fn listen(&self, event: &str, f: Rc<dyn Fn()>) -> Subscription {
        let closure = Closure::<dyn FnMut()>::new(move || f());
        if let Err(e) = self
            .0
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            tracing::warn!(event, error = ?e, "failed to add event listener");
            return Subscription::empty();
        }
        let target = self.0.clone();
        let event = event.to_string();
        Subscription::from_fn(move || {
            let _ = target
                .remove_event_listener_with_callback(&event, closure.as_ref().unchecked_ref());
        })
    }
}
