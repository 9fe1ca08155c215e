use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex, MutexGuard,
};

use crate::TolitoEvent;

/// Consumer of events. Each frontend provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TolitoEvent);
}

/// Sends events through an mpsc channel to whoever holds the receiver.
pub struct ChannelSink {
    sender: Sender<TolitoEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<TolitoEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: TolitoEvent) {
        let _ = self.sender.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TolitoEvent) {}
}

/// Stores every event for later inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<TolitoEvent>>,
}

impl CollectorSink {
    fn guard(&self) -> MutexGuard<'_, Vec<TolitoEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<TolitoEvent> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: TolitoEvent) {
        self.guard().push(event);
    }
}
