use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations.
///
/// This enum is marked `#[non_exhaustive]` and may include additional variants
/// in future releases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The initial or patch value could not be converted to JSON.
    #[error("state value could not be serialized")]
    Construction(#[from] serde_json::Error),

    /// The value was valid JSON but not an object.
    #[error("state must be an object, found {found}")]
    NotAnObject { found: &'static str },

    /// The transform passed to [`Store::try_update`](crate::Store::try_update) failed.
    #[error("state transform failed")]
    Transform(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A selector could not be parsed.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        selector: String,
        reason: &'static str,
    },

    /// A subscriber panicked while handling a notification.
    ///
    /// Listener failures are logged and never returned from a write; this
    /// variant exists so the log record has a typed source.
    #[error("listener for `{key}` panicked: {message}")]
    Listener { key: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
