//! Devices forwarding IPv4 packets between their interfaces.

use std::collections::VecDeque;
use std::sync::{
    Arc,
    Weak,
};

use parking_lot::{
    Mutex,
    RwLock,
};
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::net::config::ROUTER_INBOX_CAPACITY;
use crate::net::id::{
    Id,
    IdGenerator,
};
use crate::net::iface::EthernetInterface;
use crate::net::repr::{
    Ipv4Address,
    Ipv4Packet,
};
use crate::net::routing_table::{
    RoutingTable,
    RoutingTableRow,
};
use crate::{
    Error,
    Result,
};

/// Packet counters of a router.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterCounters {
    /// Packets handed to an interface towards their next hop.
    pub routed: u64,
    /// Packets addressed to one of the router's own addresses.
    pub delivered: u64,
    pub no_route: u64,
    pub ttl_expired: u64,
    /// Packets lost for lack of a runtime or inbox space.
    pub dropped: u64,
}

/// A host or gateway owning interfaces and a routing table.
///
/// Packets addressed to one of the router's interface addresses are delivered
/// to its inbox. Any other packet is forwarded through the best matching route.
pub struct Router {
    id: Id,
    name: String,
    table: RwLock<RoutingTable>,
    ifaces: RwLock<Vec<Arc<EthernetInterface>>>,
    counters: Mutex<RouterCounters>,
    inbox: Mutex<VecDeque<Ipv4Packet>>,
    arrived: Notify,
    me: Weak<Router>,
}

impl Router {
    pub fn new(ids: &IdGenerator, name: &str) -> Arc<Router> {
        Arc::new_cyclic(|me| Router {
            id: ids.next_id(),
            name: name.to_string(),
            table: RwLock::new(RoutingTable::new()),
            ifaces: RwLock::new(Vec::new()),
            counters: Mutex::new(RouterCounters::default()),
            inbox: Mutex::new(VecDeque::new()),
            arrived: Notify::new(),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counters(&self) -> RouterCounters {
        *self.counters.lock()
    }

    /// Attaches an interface, taking it from the router it belonged to.
    ///
    /// The route to the interface network follows the interface if it is up.
    pub fn attach_interface(&self, iface: &Arc<EthernetInterface>) {
        if let Some(old) = iface.router() {
            if old.id == self.id {
                return;
            }
            old.detach_interface(iface);
        }

        debug!("{}: attaching {}.", self.name, iface.name());
        self.ifaces.write().push(iface.clone());

        if let Some(me) = self.me.upgrade() {
            iface.set_router(Some(&me));
        }
    }

    /// Detaches an interface along with every route through it.
    pub fn detach_interface(&self, iface: &EthernetInterface) -> bool {
        let detached = {
            let mut ifaces = self.ifaces.write();
            let len = ifaces.len();
            ifaces.retain(|attached| attached.id() != iface.id());
            ifaces.len() != len
        };

        if detached {
            debug!("{}: detaching {}.", self.name, iface.name());
            iface.set_router(None);
            self.table
                .write()
                .retain(|row| row.iface().id() != iface.id());
        }

        detached
    }

    pub fn interfaces(&self) -> Vec<Arc<EthernetInterface>> {
        self.ifaces.read().clone()
    }

    /// Adds a route, returning false if an equal one is already present.
    pub fn add_route(&self, row: RoutingTableRow) -> bool {
        self.table.write().add_route(row)
    }

    pub fn delete_route(&self, row: &RoutingTableRow) -> bool {
        self.table.write().delete_route(row)
    }

    /// Returns the preferred route towards an address.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<RoutingTableRow> {
        self.table.read().lookup(addr).cloned()
    }

    /// Returns a snapshot of the routing table.
    pub fn routing_table(&self) -> RoutingTable {
        self.table.read().clone()
    }

    /// Checks whether an address belongs to one of the router's UP interfaces.
    pub fn is_local(&self, addr: Ipv4Address) -> bool {
        self.ifaces
            .read()
            .iter()
            .any(|iface| iface.is_up() && iface.inet_addr() == Some(addr))
    }

    /// Sends a packet towards its destination.
    ///
    /// The packet leaves through the interface of the preferred route, to the
    /// route gateway if it has one and to the destination itself otherwise.
    pub async fn route(&self, packet: Ipv4Packet) -> Result<()> {
        let dst_addr = packet.dst_addr();

        if self.is_local(dst_addr) {
            self.deliver(packet);
            return Ok(());
        }

        let row = match self.lookup(dst_addr) {
            Some(row) => row,
            None => {
                info!("{}: no route to host {}.", self.name, dst_addr);
                self.counters.lock().no_route += 1;
                return Err(Error::NoRoute(dst_addr));
            }
        };

        let next_hop = row.next_hop(dst_addr);
        debug!(
            "{}: routing packet for {} via {} on {}.",
            self.name,
            dst_addr,
            next_hop,
            row.iface().name()
        );

        row.iface().send_to(packet, next_hop).await?;
        self.counters.lock().routed += 1;
        Ok(())
    }

    /// Handles a packet an interface received.
    pub(crate) fn receive(&self, packet: Ipv4Packet) {
        if let Err(err) = self.forward(packet) {
            info!("{}: dropping packet, {}.", self.name, err);
        }
    }

    /// Waits for the next packet delivered to the router.
    pub async fn recv(&self) -> Ipv4Packet {
        loop {
            let arrived = self.arrived.notified();

            let packet = self.inbox.lock().pop_front();
            if let Some(packet) = packet {
                return packet;
            }

            arrived.await;
        }
    }

    /// Takes the next delivered packet, if any.
    pub fn try_recv(&self) -> Option<Ipv4Packet> {
        self.inbox.lock().pop_front()
    }

    fn forward(&self, mut packet: Ipv4Packet) -> Result<()> {
        let dst_addr = packet.dst_addr();

        if self.is_local(dst_addr) {
            self.deliver(packet);
            return Ok(());
        }

        if !packet.hop() {
            self.counters.lock().ttl_expired += 1;
            return Err(Error::TtlExpired(dst_addr));
        }

        // Resolving the next hop waits for the medium, which is delivering
        // this very packet; routing continues on the runtime instead.
        match (self.me.upgrade(), Handle::try_current()) {
            (Some(router), Ok(handle)) => {
                handle.spawn(async move {
                    if let Err(err) = router.route(packet).await {
                        debug!("{}: forwarding failed, {}.", router.name, err);
                    }
                });
            }
            _ => {
                warn!(
                    "{}: no runtime to forward packet for {}, dropping it.",
                    self.name, dst_addr
                );
                self.counters.lock().dropped += 1;
            }
        }

        Ok(())
    }

    fn deliver(&self, packet: Ipv4Packet) {
        debug!(
            "{}: packet from {} delivered locally.",
            self.name,
            packet.src_addr()
        );

        {
            let mut inbox = self.inbox.lock();
            if inbox.len() >= ROUTER_INBOX_CAPACITY {
                inbox.pop_front();
                self.counters.lock().dropped += 1;
            }
            inbox.push_back(packet);
        }

        self.counters.lock().delivered += 1;
        self.arrived.notify_one();
    }
}
