use std::{
    any::Any,
    mem::take,
    rc::{Rc, Weak},
};


/// Handle that removes a listener when it is unsubscribed or dropped.
///
/// Returned by [`Store::subscribe`](crate::Store::subscribe),
/// [`Control::listen`](crate::Control::listen) and
/// [`Transport::subscribe`](crate::Transport::subscribe).
#[derive(Default)]
#[must_use]
pub struct Subscription(RawSubscription);

impl Subscription {
    pub fn empty() -> Self {
        Subscription(RawSubscription::Empty)
    }
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Subscription(RawSubscription::Fn(Box::new(f)))
    }
    pub fn from_weak_fn<T: 'static>(
        this: Weak<T>,
        unsubscribe: impl Fn(Rc<T>) + Copy + 'static,
    ) -> Self {
        let this: Weak<dyn Any> = this;
        Subscription(RawSubscription::WeakFn {
            this,
            unsubscribe: Box::new(move |this| {
                if let Some(this) = this.upgrade() {
                    if let Ok(this) = this.downcast() {
                        unsubscribe(this)
                    }
                }
            }),
        })
    }

    /// Removes the listener.
    ///
    /// Calling this more than once has no further effect.
    pub fn unsubscribe(&mut self) {
        match take(&mut self.0) {
            RawSubscription::Empty => {}
            RawSubscription::Fn(f) => f(),
            RawSubscription::WeakFn { this, unsubscribe } => unsubscribe(this),
        }
    }

    /// Returns `true` if this handle no longer owns a listener.
    pub fn is_empty(&self) -> bool {
        matches!(self.0, RawSubscription::Empty)
    }

    /// Releases the handle without removing the listener.
    ///
    /// The listener then stays registered for as long as its source lives.
    pub fn detach(mut self) {
        self.0 = RawSubscription::Empty;
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "Subscription(<empty>)")
        } else {
            write!(f, "Subscription(<active>)")
        }
    }
}

#[derive(Default)]
enum RawSubscription {
    #[default]
    Empty,
    Fn(Box<dyn FnOnce() + 'static>),
    WeakFn {
        this: Weak<dyn Any>,
        unsubscribe: Box<dyn Fn(Weak<dyn Any>)>,
    },
}
