//! A shared broadcast medium connecting interfaces.

use std::collections::VecDeque;
use std::sync::atomic::{
    AtomicBool,
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Weak,
};

use parking_lot::{
    Mutex,
    RwLock,
};

use crate::net::id::{
    Id,
    IdGenerator,
};
use crate::net::iface::EthernetInterface;
use crate::net::observer::{
    Observers,
    TransferObserver,
};
use crate::net::repr::EthernetFrame;

/// A cable or hub: every frame transmitted on it reaches every other attached
/// interface.
///
/// Frames transmitted while the medium is delivering, e.g. an ARP reply sent
/// from inside a receive, are queued and delivered once the current frame has
/// reached all receivers.
pub struct Medium {
    id: Id,
    ifaces: RwLock<Vec<Arc<EthernetInterface>>>,
    queue: Mutex<VecDeque<(Id, EthernetFrame)>>,
    draining: AtomicBool,
    frames_carried: AtomicU64,
    observers: Observers,
    me: Weak<Medium>,
}

impl Medium {
    pub fn new(ids: &IdGenerator) -> Arc<Medium> {
        Arc::new_cyclic(|me| Medium {
            id: ids.next_id(),
            ifaces: RwLock::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            frames_carried: AtomicU64::new(0),
            observers: Observers::default(),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Attaches an interface, detaching it from the medium it was on.
    pub fn attach(&self, iface: &Arc<EthernetInterface>) {
        if let Some(old) = iface.medium() {
            if old.id == self.id {
                return;
            }
            old.detach(iface);
        }

        debug!("medium {}: attaching {}.", self.id, iface.name());
        self.ifaces.write().push(iface.clone());
        iface.set_medium(self.me.clone());
    }

    /// Detaches an interface, returning whether it was attached.
    pub fn detach(&self, iface: &EthernetInterface) -> bool {
        let detached = {
            let mut ifaces = self.ifaces.write();
            let len = ifaces.len();
            ifaces.retain(|attached| attached.id() != iface.id());
            ifaces.len() != len
        };

        if detached {
            debug!("medium {}: detaching {}.", self.id, iface.name());
            iface.clear_medium();
        }

        detached
    }

    /// Detaches every interface.
    pub fn disconnect_all(&self) {
        let ifaces = std::mem::take(&mut *self.ifaces.write());
        for iface in ifaces {
            iface.clear_medium();
        }
    }

    pub fn interfaces(&self) -> Vec<Arc<EthernetInterface>> {
        self.ifaces.read().clone()
    }

    pub fn len(&self) -> usize {
        self.ifaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ifaces.read().is_empty()
    }

    /// Returns the number of frames delivered so far.
    pub fn frames_carried(&self) -> u64 {
        self.frames_carried.load(Ordering::Relaxed)
    }

    pub fn add_observer(&self, observer: Arc<dyn TransferObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn TransferObserver>) -> bool {
        self.observers.remove(observer)
    }

    /// Carries a frame from the interface src to every other attached
    /// interface.
    pub(crate) fn transmit(&self, src: Id, frame: EthernetFrame) {
        self.queue.lock().push_back((src, frame));

        // Whoever is already delivering picks the frame up.
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }

        loop {
            loop {
                let next = self.queue.lock().pop_front();
                match next {
                    Some((src, frame)) => self.deliver(src, &frame),
                    None => break,
                }
            }

            self.draining.store(false, Ordering::Release);

            // A frame queued between the last pop and the store above would
            // otherwise be stranded.
            if self.queue.lock().is_empty() || self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
        }
    }

    fn deliver(&self, src: Id, frame: &EthernetFrame) {
        let ifaces = self.ifaces.read();

        self.frames_carried.fetch_add(1, Ordering::Relaxed);
        self.observers.transferred(frame);

        for iface in ifaces.iter().filter(|iface| iface.id() != src) {
            iface.receive(frame);
        }
    }
}

impl Drop for Medium {
    fn drop(&mut self) {
        for iface in self.ifaces.get_mut().drain(..) {
            iface.clear_medium();
        }
    }
}
