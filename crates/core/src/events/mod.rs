//! Typed lifecycle notifications.
//!
//! Each notification kind has its own [`Listeners`] slot. Callbacks run
//! synchronously on the thread that drives the player.

use std::fmt;

use crate::{ErrorCode, Metadata, PlayerError};

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

pub struct Listeners<T> {
    next_id: u64,
    slots: Vec<(ListenerId, Callback<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            slots: Vec::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&T) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` when `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot, _)| *slot != id);
        self.slots.len() != before
    }

    /// Calls every listener in subscription order.
    pub fn emit(&mut self, value: &T) {
        for (_, callback) in &mut self.slots {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.slots.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedEvent {
    pub metadata: Metadata,
    pub object_count: usize,
    pub duration: f64,
    /// Number of sound events prepared for playback.
    pub sound_events: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUpdate {
    pub time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub reason: String,
}

impl From<&PlayerError> for ErrorEvent {
    fn from(err: &PlayerError) -> Self {
        Self {
            code: err.code(),
            reason: err.to_string(),
        }
    }
}

/// One listener slot per notification the player emits.
#[derive(Debug, Default)]
pub struct PlayerEvents {
    pub loaded: Listeners<LoadedEvent>,
    pub time_update: Listeners<TimeUpdate>,
    /// `true` when playback starts, `false` when it stops.
    pub state_change: Listeners<bool>,
    pub ended: Listeners<()>,
    pub seeked: Listeners<f64>,
    pub error: Listeners<ErrorEvent>,
}

impl PlayerEvents {
    pub fn clear(&mut self) {
        self.loaded.clear();
        self.time_update.clear();
        self.state_change.clear();
        self.ended.clear();
        self.seeked.clear();
        self.error.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.loaded.len()
            + self.time_update.len()
            + self.state_change.len()
            + self.ended.len()
            + self.seeked.len()
            + self.error.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn emits_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<u32>::default();

        let first = Rc::clone(&log);
        listeners.subscribe(move |value| first.borrow_mut().push(("a", *value)));
        let second = Rc::clone(&log);
        listeners.subscribe(move |value| second.borrow_mut().push(("b", *value)));

        listeners.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_by_handle() {
        let hits = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::<()>::default();

        let counter = Rc::clone(&hits);
        let id = listeners.subscribe(move |_| *counter.borrow_mut() += 1);

        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.emit(&());
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn clear_drops_every_slot() {
        let mut events = PlayerEvents::default();
        events.seeked.subscribe(|_| {});
        events.ended.subscribe(|_| {});
        assert_eq!(events.listener_count(), 2);

        events.clear();
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn error_event_carries_code() {
        let event = ErrorEvent::from(&PlayerError::AudioDecodeFailure("truncated".into()));

        assert_eq!(event.code, ErrorCode::AudioDecodeFailure);
        assert_eq!(event.reason, "audio decode failure: truncated");
    }
}
