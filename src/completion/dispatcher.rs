//! Fragment dispatcher
//!
//! A synchronous publish/subscribe registry keyed by event name. Subscribers
//! of one event run in registration order and all receive the same payload
//! reference. Registration happens before dispatch; `publish` only needs a
//! shared borrow, so the table cannot change while events are being fired.

use std::collections::HashMap;

use tracing::{debug, trace};

/// Subscriber callable
pub type Handler<P> = Box<dyn Fn(&P)>;

/// Event registry mapping event names to ordered subscriber lists
pub struct Dispatcher<P> {
    subscribers: HashMap<String, Vec<Handler<P>>>,
    async_subscriptions: usize,
}

impl<P> Dispatcher<P> {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            async_subscriptions: 0,
        }
    }

    /// Append a subscriber for `event`
    ///
    /// Subscribing the same callable twice makes it run twice.
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F)
    where
        F: Fn(&P) + 'static,
    {
        let event = event.into();
        trace!(event = %event, "subscribe");
        self.subscribers
            .entry(event)
            .or_default()
            .push(Box::new(handler));
    }

    /// Append a subscriber that is expected to answer with a deferred reply
    pub fn subscribe_async<F>(&mut self, event: impl Into<String>, handler: F)
    where
        F: Fn(&P) + 'static,
    {
        self.subscribe(event, handler);
        self.async_subscriptions += 1;
    }

    /// Invoke every subscriber of `event`, in registration order
    ///
    /// # Returns
    /// * `usize` - Number of subscribers that ran
    pub fn publish(&self, event: &str, payload: &P) -> usize {
        let Some(handlers) = self.subscribers.get(event) else {
            debug!(event, subscribers = 0, "publish");
            return 0;
        };

        debug!(event, subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of subscribers registered for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map_or(0, Vec::len)
    }

    /// Number of subscriptions made through [`Dispatcher::subscribe_async`]
    pub fn async_subscriptions(&self) -> usize {
        self.async_subscriptions
    }
}

impl<P> Default for Dispatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_publish_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new();

        for name in ["first", "second", "third"] {
            let log = log.clone();
            dispatcher.subscribe("tick", move |value: &u32| {
                log.borrow_mut().push(format!("{name}:{value}"));
            });
        }

        assert_eq!(dispatcher.publish("tick", &7), 3);
        assert_eq!(*log.borrow(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let dispatcher: Dispatcher<()> = Dispatcher::new();
        assert_eq!(dispatcher.publish("nothing", &()), 0);
    }

    #[test]
    fn test_no_deduplication() {
        let count = Rc::new(RefCell::new(0));
        let mut dispatcher: Dispatcher<()> = Dispatcher::new();
        for _ in 0..2 {
            let count = count.clone();
            dispatcher.subscribe("arg0", move |_: &()| *count.borrow_mut() += 1);
        }

        dispatcher.publish("arg0", &());
        assert_eq!(*count.borrow(), 2);
        assert_eq!(dispatcher.subscriber_count("arg0"), 2);
    }

    #[test]
    fn test_same_payload_reference() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher: Dispatcher<String> = Dispatcher::new();
        for _ in 0..2 {
            let seen = seen.clone();
            dispatcher.subscribe("e", move |payload: &String| {
                seen.borrow_mut().push(payload as *const String as usize);
            });
        }

        let payload = "line".to_string();
        dispatcher.publish("e", &payload);
        let seen = seen.borrow();
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0], &payload as *const String as usize);
    }

    #[test]
    fn test_async_counter() {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new();
        dispatcher.subscribe("a", |_: &()| {});
        dispatcher.subscribe_async("b", |_: &()| {});
        dispatcher.subscribe_async("b", |_: &()| {});
        assert_eq!(dispatcher.async_subscriptions(), 2);
        assert_eq!(dispatcher.subscriber_count("b"), 2);
    }
}
