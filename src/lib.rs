//! An observable key/value store with two-way binding to form controls.
//!
//! ```
//! use pan_store::{bind, dom::Node, BindingMap, Store};
//! use serde_json::json;
//!
//! let store = Store::new(json!({ "name": "Ada" })).unwrap();
//! let input = Node::input("text").with_attr("name", "name");
//! let form = Node::new("form").with_child(input.clone());
//!
//! let _binding = bind(&form, &store, &BindingMap::from([("input[name=name]", "name")]));
//! assert_eq!(input.value(), "Ada");
//!
//! input.input_text("Grace");
//! assert_eq!(store.get("name"), Some(json!("Grace")));
//!
//! store.set("name", "Hopper");
//! assert_eq!(input.value(), "Hopper");
//! ```

mod bind;
mod error;
mod store;
mod stream;
mod subscription;
mod transport;
mod utils;

pub mod dom;
#[cfg(feature = "web")]
pub mod web;

pub use bind::*;
pub use error::*;
pub use store::*;
pub use stream::*;
pub use subscription::*;
pub use transport::*;
pub use utils::{is_truthy, to_text};
