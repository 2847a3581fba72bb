//! Ethernet interfaces attaching devices to media.
//!
//! An interface owns its address configuration, traffic counters and ARP
//! cache. It holds non-owning handles to the router and medium it is attached
//! to; those own the interface in turn.

mod arp;
mod ethernet;

use std::fmt::{
    Debug,
    Display,
    Formatter,
    Result as FmtResult,
};
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Weak,
};

use parking_lot::Mutex;

use crate::net::arp_cache::ArpCache;
use crate::net::config::{
    InterfaceConfig,
    DIRECT_ROUTE_METRIC,
};
use crate::net::id::{
    Id,
    IdGenerator,
};
use crate::net::medium::Medium;
use crate::net::observer::{
    Observers,
    TransferObserver,
};
use crate::net::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::net::router::Router;
use crate::net::routing_table::RoutingTableRow;
use crate::{
    Error,
    Result,
};

use self::arp::PendingRequests;

/// Administrative status of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match *self {
            Status::Up => write!(f, "UP"),
            Status::Down => write!(f, "DOWN"),
        }
    }
}

/// Traffic counters of an interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    /// Frames received for an IPv4 packet without a router to hand it to.
    pub rx_dropped: u64,
    /// Packets abandoned because their next hop did not resolve.
    pub tx_dropped: u64,
}

/// Addressing in effect while an interface is up.
#[derive(Clone, Copy, Debug)]
struct Binding {
    network: Ipv4Address,
    netmask: Ipv4Address,
    broadcast: Ipv4Address,
}

struct State {
    status: Status,
    inet_addr: Option<Ipv4Address>,
    netmask: Option<Ipv4Address>,
    broadcast: Option<Ipv4Address>,
    binding: Option<Binding>,
    router: Weak<Router>,
    // Network and netmask of the direct route installed into the router. The
    // row itself holds the interface and is rebuilt when removed.
    route: Option<(Ipv4Address, Ipv4Address)>,
}

/// An Ethernet style network interface.
pub struct EthernetInterface {
    id: Id,
    ethernet_addr: EthernetAddress,
    config: InterfaceConfig,
    name: Mutex<String>,
    bandwidth: AtomicU64,
    state: Mutex<State>,
    counters: Mutex<Counters>,
    medium: Mutex<Weak<Medium>>,
    arp_cache: Mutex<ArpCache>,
    pending: Mutex<PendingRequests>,
    observers: Observers,
    me: Weak<EthernetInterface>,
}

impl EthernetInterface {
    /// Creates a detached interface which is down and has no addresses.
    pub fn new(
        ids: &IdGenerator,
        ethernet_addr: EthernetAddress,
        name: &str,
        config: InterfaceConfig,
    ) -> Arc<EthernetInterface> {
        Arc::new_cyclic(|me| EthernetInterface {
            id: ids.next_id(),
            ethernet_addr,
            arp_cache: Mutex::new(ArpCache::new(config.arp_cache_capacity)),
            config,
            name: Mutex::new(name.to_string()),
            bandwidth: AtomicU64::new(0),
            state: Mutex::new(State {
                status: Status::Down,
                inet_addr: None,
                netmask: None,
                broadcast: None,
                binding: None,
                router: Weak::new(),
                route: None,
            }),
            counters: Mutex::new(Counters::default()),
            medium: Mutex::new(Weak::new()),
            pending: Mutex::new(PendingRequests::default()),
            observers: Observers::default(),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn ethernet_addr(&self) -> EthernetAddress {
        self.ethernet_addr
    }

    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.lock() = name.to_string();
    }

    /// Returns the nominal bandwidth in bits per second, informational only.
    pub fn bandwidth(&self) -> u64 {
        self.bandwidth.load(Ordering::Relaxed)
    }

    pub fn set_bandwidth(&self, bandwidth: u64) {
        self.bandwidth.store(bandwidth, Ordering::Relaxed);
    }

    /// Describes the link layer encapsulation, ifconfig style.
    pub fn encap(&self) -> String {
        format!("Ethernet  HWaddr {}", self.ethernet_addr)
    }

    pub fn counters(&self) -> Counters {
        *self.counters.lock()
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn is_up(&self) -> bool {
        self.status() == Status::Up
    }

    pub fn inet_addr(&self) -> Option<Ipv4Address> {
        self.state.lock().inet_addr
    }

    /// Returns the configured netmask, or the inferred one while up.
    pub fn netmask(&self) -> Option<Ipv4Address> {
        let state = self.state.lock();
        state
            .netmask
            .or_else(|| state.binding.map(|binding| binding.netmask))
    }

    /// Returns the configured broadcast address, or the inferred one while up.
    pub fn broadcast_addr(&self) -> Option<Ipv4Address> {
        let state = self.state.lock();
        state
            .broadcast
            .or_else(|| state.binding.map(|binding| binding.broadcast))
    }

    /// Returns the network the interface address belongs to.
    pub fn network_addr(&self) -> Option<Ipv4Address> {
        let state = self.state.lock();
        match state.binding {
            Some(binding) => Some(binding.network),
            None => match (state.inet_addr, state.netmask) {
                (Some(inet_addr), Some(netmask)) => Some(inet_addr.network(netmask)),
                _ => None,
            },
        }
    }

    /// Sets the IPv4 address, cycling the interface if it is up.
    pub fn set_inet_addr(&self, inet_addr: Option<Ipv4Address>) -> Result<()> {
        self.update(|state| state.inet_addr = inet_addr)
    }

    /// Sets the netmask, cycling the interface if it is up. None falls back to
    /// the classful netmask of the address.
    pub fn set_netmask(&self, netmask: Option<Ipv4Address>) -> Result<()> {
        self.update(|state| state.netmask = netmask)
    }

    /// Sets the broadcast address, cycling the interface if it is up. None
    /// falls back to the directed broadcast of the network.
    pub fn set_broadcast_addr(&self, broadcast: Option<Ipv4Address>) -> Result<()> {
        self.update(|state| state.broadcast = broadcast)
    }

    /// Brings the interface up or down.
    ///
    /// Going up validates the address configuration and installs a route to
    /// the interface network into the router. Going down removes that route
    /// and cancels outstanding address resolutions.
    pub fn set_status(&self, status: Status) -> Result<()> {
        let mut state = self.state.lock();

        match (state.status, status) {
            (Status::Down, Status::Up) => self.bring_up(&mut state),
            (Status::Up, Status::Down) => {
                self.bring_down(&mut state);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn router(&self) -> Option<Arc<Router>> {
        self.state.lock().router.upgrade()
    }

    pub fn medium(&self) -> Option<Arc<Medium>> {
        self.medium.lock().upgrade()
    }

    /// Plugs the interface into a medium, unplugging it from any other.
    pub fn connect_medium(&self, medium: &Arc<Medium>) {
        if let Some(me) = self.me.upgrade() {
            medium.attach(&me);
        }
    }

    /// Unplugs the interface from its medium.
    pub fn disconnect_medium(&self) {
        if let Some(medium) = self.medium() {
            medium.detach(self);
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn TransferObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn TransferObserver>) -> bool {
        self.observers.remove(observer)
    }

    /// Applies an address change, cycling the interface through down and up
    /// if it is up. A change the interface cannot come up with is reverted and
    /// leaves the interface down.
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut State),
    {
        let mut state = self.state.lock();

        if state.status == Status::Down {
            f(&mut state);
            return Ok(());
        }

        let saved = (state.inet_addr, state.netmask, state.broadcast);
        self.bring_down(&mut state);
        f(&mut state);

        if let Err(err) = self.bring_up(&mut state) {
            debug!("{}: rejecting address change, {}.", self.name(), err);
            (state.inet_addr, state.netmask, state.broadcast) = saved;
            return Err(err);
        }

        Ok(())
    }

    fn bring_up(&self, state: &mut State) -> Result<()> {
        let name = self.name();

        let inet_addr = state.inet_addr.ok_or_else(|| {
            Error::AddressConfiguration(format!("{}: set the inet address first", name))
        })?;

        let netmask = match state.netmask {
            Some(netmask) => netmask,
            None => {
                let netmask = inet_addr.default_netmask().ok_or_else(|| {
                    Error::AddressConfiguration(format!(
                        "{}: can not infer a netmask for {}",
                        name, inet_addr
                    ))
                })?;
                debug!("{}: inferred netmask {} for {}.", name, netmask, inet_addr);
                netmask
            }
        };

        if !netmask.is_netmask() {
            return Err(Error::AddressConfiguration(format!(
                "{}: netmask {} is not contiguous",
                name, netmask
            )));
        }

        let network = inet_addr.network(netmask);
        if network == inet_addr {
            return Err(Error::AddressConfiguration(format!(
                "{}: inet address {} equals the network address",
                name, inet_addr
            )));
        }

        let broadcast = state
            .broadcast
            .unwrap_or_else(|| inet_addr.broadcast(netmask));
        if broadcast == inet_addr {
            return Err(Error::AddressConfiguration(format!(
                "{}: inet address {} equals the broadcast address",
                name, inet_addr
            )));
        }

        state.binding = Some(Binding {
            network,
            netmask,
            broadcast,
        });

        if let Err(err) = self.install_route(state) {
            state.binding = None;
            return Err(err);
        }

        debug!(
            "{}: up, address {}, netmask {}, broadcast {}.",
            name, inet_addr, netmask, broadcast
        );
        state.status = Status::Up;
        Ok(())
    }

    fn bring_down(&self, state: &mut State) {
        self.remove_route(state);
        state.binding = None;
        state.status = Status::Down;
        debug!("{}: down.", self.name());

        self.cancel_resolutions();
    }

    fn install_route(&self, state: &mut State) -> Result<()> {
        let binding = match state.binding {
            Some(binding) => binding,
            None => return Ok(()),
        };

        let router = match state.router.upgrade() {
            Some(router) => router,
            None => return Ok(()),
        };

        if let Some(row) = self.direct_route(binding.network, binding.netmask)? {
            debug!(
                "{}: installing route to {}/{} into {}.",
                self.name(),
                binding.network,
                binding.netmask,
                router.name()
            );
            router.add_route(row);
            state.route = Some((binding.network, binding.netmask));
        }

        Ok(())
    }

    fn remove_route(&self, state: &mut State) {
        let (network, netmask) = match state.route.take() {
            Some(route) => route,
            None => return,
        };

        if let (Some(router), Ok(Some(row))) =
            (state.router.upgrade(), self.direct_route(network, netmask))
        {
            debug!(
                "{}: removing route to {}/{} from {}.",
                self.name(),
                network,
                netmask,
                router.name()
            );
            router.delete_route(&row);
        }
    }

    /// Builds the row routing the interface network through the interface,
    /// or None while the interface is being dropped.
    fn direct_route(
        &self,
        network: Ipv4Address,
        netmask: Ipv4Address,
    ) -> Result<Option<RoutingTableRow>> {
        let me = match self.me.upgrade() {
            Some(me) => me,
            None => return Ok(None),
        };

        RoutingTableRow::new(network, netmask, None, DIRECT_ROUTE_METRIC, me)
            .map(Some)
            .map_err(|err| Error::AddressConfiguration(err.to_string()))
    }

    /// Moves the interface to another router, carrying its direct route along.
    pub(crate) fn set_router(&self, router: Option<&Arc<Router>>) {
        let mut state = self.state.lock();

        self.remove_route(&mut state);
        state.router = router.map(Arc::downgrade).unwrap_or_default();

        if let Err(err) = self.install_route(&mut state) {
            warn!("{}: failed to install route, {}.", self.name(), err);
        }
    }

    pub(crate) fn set_medium(&self, medium: Weak<Medium>) {
        *self.medium.lock() = medium;
    }

    pub(crate) fn clear_medium(&self) {
        *self.medium.lock() = Weak::new();
        self.cancel_resolutions();
    }
}

impl Display for EthernetInterface {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

impl Debug for EthernetInterface {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("EthernetInterface")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("ethernet_addr", &self.ethernet_addr)
            .field("status", &self.status())
            .finish()
    }
}
