//! An in-memory element tree.
//!
//! [`Node`] implements [`Element`] and [`Control`], so it can host a
//! [`bind`](crate::bind()) without a browser. Programmatic writes through
//! [`Node::set_value`] and [`Node::set_checked`] never dispatch events; the
//! user-input helpers [`Node::input_text`] and [`Node::click`] do.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use slabmap::SlabMap;

use crate::{utils::call_listener, Control, ControlKind, Element, Result, Subscription};

mod selector;

pub use selector::SelectorList;

#[cfg(test)]
mod tests;

#[derive_ex(Clone)]
pub struct Node(Rc<NodeData>);

struct NodeData {
    tag: String,
    attrs: RefCell<Vec<(String, String)>>,
    value: RefCell<String>,
    checked: Cell<bool>,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
    listeners: RefCell<SlabMap<(String, Rc<dyn Fn()>)>>,
}

impl NodeData {
    fn is_listening(&self, id: usize, f: &Rc<dyn Fn()>) -> bool {
        self.listeners
            .borrow()
            .get(id)
            .is_some_and(|(_, g)| Rc::ptr_eq(f, g))
    }
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(NodeData {
            tag: tag.to_ascii_lowercase(),
            attrs: RefCell::new(Vec::new()),
            value: RefCell::new(String::new()),
            checked: Cell::new(false),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            listeners: RefCell::new(SlabMap::new()),
        }))
    }

    /// Creates an `<input>` with the given `type`.
    pub fn input(ty: &str) -> Self {
        Self::new("input").with_attr("type", ty)
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(&child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }
    pub fn attr(&self, name: &str) -> Option<String> {
        self.0
            .attrs
            .borrow()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Sets an attribute.
    ///
    /// Like a freshly parsed document, `value` also sets the current value and
    /// `checked` also checks the control.
    pub fn set_attr(&self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "value" => *self.0.value.borrow_mut() = value.to_string(),
            "checked" => self.0.checked.set(true),
            _ => {}
        }
        let mut attrs = self.0.attrs.borrow_mut();
        if let Some(entry) = attrs.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value.to_string();
        } else {
            attrs.push((name, value.to_string()));
        }
    }

    /// Appends `child`, detaching it from its previous parent.
    pub fn append_child(&self, child: &Node) {
        if let Some(old) = child.parent() {
            old.0
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(&c.0, &child.0));
        }
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    /// Descendants of this node in document order, excluding itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        self.collect_descendants(&mut nodes);
        nodes
    }
    fn collect_descendants(&self, nodes: &mut Vec<Node>) {
        for child in self.children() {
            nodes.push(child.clone());
            child.collect_descendants(nodes);
        }
    }

    fn root(&self) -> Node {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Descendants matching `selector`.
    pub fn try_query_selector_all(&self, selector: &str) -> Result<Vec<Node>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|n| selector.matches(n))
            .collect())
    }
    pub fn query_selector(&self, selector: &str) -> Option<Node> {
        Element::query_selector_all(self, selector).into_iter().next()
    }

    pub fn value(&self) -> String {
        self.0.value.borrow().clone()
    }
    pub fn set_value(&self, value: &str) {
        *self.0.value.borrow_mut() = value.to_string();
    }
    pub fn checked(&self) -> bool {
        self.0.checked.get()
    }

    /// Sets the checked state.
    ///
    /// Checking a radio button unchecks the other radio buttons with the same
    /// `name` in the same tree.
    pub fn set_checked(&self, checked: bool) {
        self.0.checked.set(checked);
        if !checked || self.kind() != ControlKind::Radio {
            return;
        }
        let Some(name) = self.attr("name") else {
            return;
        };
        for other in self.root().descendants() {
            if !Rc::ptr_eq(&other.0, &self.0)
                && other.kind() == ControlKind::Radio
                && other.attr("name").as_deref() == Some(name.as_str())
            {
                other.0.checked.set(false);
            }
        }
    }

    pub fn add_event_listener(&self, event: &str, f: impl Fn() + 'static) -> Subscription {
        self.listen_rc(event, Rc::new(f))
    }
    fn listen_rc(&self, event: &str, f: Rc<dyn Fn()>) -> Subscription {
        let id = self
            .0
            .listeners
            .borrow_mut()
            .insert((event.to_string(), f));
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<NodeData>| {
            node.listeners.borrow_mut().remove(id);
        })
    }
    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    /// Calls every listener registered for `event`.
    ///
    /// A panicking listener is logged and does not stop the others.
    /// A listener removed by an earlier one in the same dispatch is skipped.
    pub fn dispatch(&self, event: &str) {
        let listeners: Vec<_> = self
            .0
            .listeners
            .borrow()
            .iter()
            .filter(|(_, (e, _))| e == event)
            .map(|(id, (_, f))| (id, f.clone()))
            .collect();
        for (id, f) in listeners {
            if !self.0.is_listening(id, &f) {
                continue;
            }
            call_listener(event, || f());
        }
    }

    /// Replaces the text as a user would and fires `input` then `change`.
    pub fn input_text(&self, text: &str) {
        self.set_value(text);
        self.dispatch("input");
        self.dispatch("change");
    }

    /// Clicks the control as a user would.
    ///
    /// A checkbox toggles and a radio button becomes checked. `input` and
    /// `change` fire only if the checked state changed.
    pub fn click(&self) {
        let changed = match self.kind() {
            ControlKind::Checkbox => {
                self.set_checked(!self.checked());
                true
            }
            ControlKind::Radio => {
                let changed = !self.checked();
                self.set_checked(true);
                changed
            }
            ControlKind::Text => false,
        };
        self.dispatch("click");
        if changed {
            self.dispatch("input");
            self.dispatch("change");
        }
    }
}
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}", self.0.tag)?;
        if let Ok(attrs) = self.0.attrs.try_borrow() {
            for (name, value) in attrs.iter() {
                write!(f, " {name}={value:?}")?;
            }
        }
        write!(f, ">")
    }
}

impl Element for Node {
    type Control = Node;

    fn query_selector_all(&self, selector: &str) -> Vec<Node> {
        match self.try_query_selector_all(selector) {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring selector");
                Vec::new()
            }
        }
    }
}

impl Control for Node {
    fn kind(&self) -> ControlKind {
        if self.0.tag == "input" {
            ControlKind::from_type(&self.attr("type").unwrap_or_default())
        } else {
            ControlKind::Text
        }
    }
    fn value(&self) -> String {
        Node::value(self)
    }
    fn set_value(&self, value: &str) {
        Node::set_value(self, value)
    }
    fn checked(&self) -> bool {
        Node::checked(self)
    }
    fn set_checked(&self, checked: bool) {
        Node::set_checked(self, checked)
    }
    fn listen(&self, event: &str, f: Rc<dyn Fn()>) -> Subscription {
        self.listen_rc(event, f)
    }
}
