//! Reload diff/dispatch. A candidate tree is validated and swapped in by
//! the caller (see `relaycore-config`); this crate answers the question
//! "what changed, and who needs to know" and notifies each registered
//! [`Subscriber`] in registration order.

pub mod diff;
pub mod event;

pub use event::ReloadEvent;
use relaycore_config::Directive;
use relaycore_error::CoreError;

/// Something that reacts to configuration changes. The flattened-event
/// shape (see [`event`]) means implementors only need the one method,
/// matching on the variants they care about.
pub trait Subscriber {
    fn name(&self) -> &str;
    fn on_reload(&self, event: &ReloadEvent) -> Result<(), CoreError>;
}

/// Ordered subscriber registry plus the dispatch entry point.
#[derive(Default)]
pub struct ReloadDispatcher {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl ReloadDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribers are notified in the order they were registered in.
    pub fn register(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Diffs `old` against `new` and notifies every subscriber of every
    /// resulting event, in order. The first subscriber error aborts
    /// dispatch of all remaining events — the caller (the signal/reload
    /// handler) is expected to log it and continue running on the tree
    /// that is, by then, already active.
    pub fn dispatch(&self, old: &Directive, new: &Directive) -> Result<Vec<ReloadEvent>, CoreError> {
        let events = diff::diff(old, new)?;
        for event in &events {
            for subscriber in &self.subscribers {
                if let Err(e) = subscriber.on_reload(event) {
                    tracing::warn!(subscriber = subscriber.name(), ?event, error = %e.summary(), "reload subscriber failed");
                    return Err(e);
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycore_config::parser::parse_str;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Recorder {
        label: &'static str,
        calls: Arc<AtomicUsize>,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Subscriber for Recorder {
        fn name(&self) -> &str {
            self.label
        }
        fn on_reload(&self, _event: &ReloadEvent) -> Result<(), CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn subscribers_fire_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut dispatcher = ReloadDispatcher::new();
        dispatcher.register(Box::new(Recorder { label: "first", calls: Arc::new(AtomicUsize::new(0)), order: order.clone() }));
        dispatcher.register(Box::new(Recorder { label: "second", calls: Arc::new(AtomicUsize::new(0)), order: order.clone() }));

        let a = parse_str("listen 1935;").unwrap();
        let b = parse_str("listen 1936;").unwrap();
        dispatcher.dispatch(&a, &b).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    struct Failing;
    impl Subscriber for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn on_reload(&self, _event: &ReloadEvent) -> Result<(), CoreError> {
            Err(relaycore_error::core_err!(relaycore_error::ErrorKind::SystemConfigInvalid, "nope"))
        }
    }

    #[test]
    fn first_subscriber_error_aborts_remaining_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut dispatcher = ReloadDispatcher::new();
        dispatcher.register(Box::new(Failing));
        dispatcher.register(Box::new(Recorder { label: "never", calls: calls.clone(), order }));

        let a = parse_str("listen 1935;").unwrap();
        let b = parse_str("listen 1936;").unwrap();
        assert!(dispatcher.dispatch(&a, &b).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
