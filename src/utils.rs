use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

use serde_json::Value;

use crate::Error;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub mod test_helpers;

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `null`, `false`, `0` and `""` are falsy. A missing value is falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Text form of a value as written into a control.
///
/// Returns `None` for `null` and for a missing value.
pub fn to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        value => Some(value.to_string()),
    }
}

/// Runs a listener, turning a panic into a logged [`Error::Listener`].
///
/// Returns `false` if the listener panicked.
pub(crate) fn call_listener(key: &str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let e = Error::Listener {
                key: key.to_string(),
                message: panic_message(&*payload),
            };
            tracing::error!(error = %e, "listener failed, continuing broadcast");
            false
        }
    }
}

/// Runs a teardown step. A panic is logged and swallowed.
pub(crate) fn teardown(f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::warn!(
            message = %panic_message(&*payload),
            "teardown step panicked, ignoring"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
