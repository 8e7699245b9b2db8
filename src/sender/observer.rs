use crate::tools::uint128::Uint128;
use std::sync::{Arc, RwLock};

/// Object a transfer event refers to
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FileInfo {
    /// Object TOI
    pub toi: Uint128,
}

/// Transfer lifecycle event
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Event {
    /// Transfer of an object started
    StartTransfer(FileInfo),
    /// Transfer of an object stopped
    StopTransfer(FileInfo),
}

/// Receives the transfer events of a `Sender`.
///
/// Dispatch happens on the thread driving the sender, a subscriber must not
/// call back into the sender during dispatch.
pub trait Subscriber: Send + Sync {
    /// A transfer event was emitted
    fn on_sender_event(&self, evt: &Event, now: std::time::SystemTime);
}

#[derive(Clone)]
pub struct ObserverList(Arc<RwLock<Vec<Arc<dyn Subscriber>>>>);

impl ObserverList {
    pub fn new() -> Self {
        ObserverList(Arc::new(RwLock::new(Vec::new())))
    }

    pub fn subscribe(&mut self, s: Arc<dyn Subscriber>) {
        self.0.write().unwrap().push(s);
    }

    pub fn unsubscribe(&mut self, s: Arc<dyn Subscriber>) {
        self.0
            .write()
            .unwrap()
            .retain(|a| !std::ptr::eq(a.as_ref() as *const _, s.as_ref() as *const _))
    }

    pub fn dispatch(&self, event: &Event, now: std::time::SystemTime) {
        let lock = self.0.read().unwrap();

        for subscriber in lock.iter() {
            subscriber.on_sender_event(event, now);
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObserverList")
    }
}
