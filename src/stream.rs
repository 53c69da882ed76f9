use std::{
    cell::RefCell,
    collections::VecDeque,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use futures::Stream;

use crate::{Notification, Store, Subscription};

#[cfg(test)]
mod tests;

impl Store {
    /// Returns a stream of every notification sent after this call.
    ///
    /// Notifications are queued until polled. The queue is unbounded, so a
    /// stream that is kept alive must be drained. The stream never ends on its
    /// own; dropping it unsubscribes.
    pub fn notifications(&self) -> NotificationStream {
        let data = Rc::new(RefCell::new(Data::default()));
        let weak = Rc::downgrade(&data);
        let subscription = self.subscribe(move |n| {
            let Some(data) = weak.upgrade() else {
                return;
            };
            let waker = {
                let mut d = data.borrow_mut();
                d.queue.push_back(n.clone());
                d.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        NotificationStream {
            data,
            _subscription: subscription,
        }
    }
}

#[derive(Default)]
struct Data {
    queue: VecDeque<Notification>,
    waker: Option<Waker>,
}

/// Stream returned by [`Store::notifications`].
pub struct NotificationStream {
    data: Rc<RefCell<Data>>,
    _subscription: Subscription,
}

impl NotificationStream {
    /// Number of notifications waiting to be polled.
    pub fn pending(&self) -> usize {
        self.data.borrow().queue.len()
    }
}

impl Stream for NotificationStream {
    type Item = Notification;
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let mut d = self.data.borrow_mut();
        if let Some(n) = d.queue.pop_front() {
            Poll::Ready(Some(n))
        } else {
            d.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}
