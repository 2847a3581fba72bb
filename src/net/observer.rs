//! Notifications about frames moving through the simulation.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::net::repr::EthernetFrame;

/// Receives notifications about frames crossing an interface or a medium.
///
/// Interfaces call transferred() followed by either transmitted() or
/// received(), exactly once per frame. Media only call transferred(). Callbacks
/// run synchronously on the thread moving the frame and must not attach or
/// detach interfaces.
pub trait TransferObserver: Send + Sync {
    fn transferred(&self, _frame: &EthernetFrame) {}

    fn transmitted(&self, _frame: &EthernetFrame) {}

    fn received(&self, _frame: &EthernetFrame) {}
}

/// A set of registered observers.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn TransferObserver>>>,
}

impl Observers {
    pub fn add(&self, observer: Arc<dyn TransferObserver>) {
        self.observers.write().push(observer);
    }

    /// Removes a previously added observer, returning whether it was present.
    pub fn remove(&self, observer: &Arc<dyn TransferObserver>) -> bool {
        let mut observers = self.observers.write();
        let len = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != len
    }

    pub fn transferred(&self, frame: &EthernetFrame) {
        for observer in self.snapshot() {
            observer.transferred(frame);
        }
    }

    pub fn transmitted(&self, frame: &EthernetFrame) {
        for observer in self.snapshot() {
            observer.transferred(frame);
            observer.transmitted(frame);
        }
    }

    pub fn received(&self, frame: &EthernetFrame) {
        for observer in self.snapshot() {
            observer.transferred(frame);
            observer.received(frame);
        }
    }

    // Observers may unregister themselves from a callback.
    fn snapshot(&self) -> Vec<Arc<dyn TransferObserver>> {
        self.observers.read().clone()
    }
}
