//! Routes ordered by priority with longest-prefix-match lookup.
//!
//! Rows are kept in a `BTreeSet` ordered so that iteration starts with the most
//! specific route: a longer netmask always wins, the metric only decides
//! between rows with equal netmasks. Lookup is therefore a scan for the first
//! matching row.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{
    Debug,
    Display,
    Formatter,
    Result as FmtResult,
};
use std::sync::Arc;

use crate::net::iface::EthernetInterface;
use crate::net::repr::Ipv4Address;
use crate::{
    Error,
    Result,
};

/// A route towards target/netmask through an interface, optionally via a
/// gateway.
#[derive(Clone)]
pub struct RoutingTableRow {
    target: Ipv4Address,
    netmask: Ipv4Address,
    gateway: Option<Ipv4Address>,
    metric: u32,
    iface: Arc<EthernetInterface>,
}

impl RoutingTableRow {
    /// Creates a route, checking that target is the network address implied by
    /// netmask and that netmask is contiguous.
    pub fn new(
        target: Ipv4Address,
        netmask: Ipv4Address,
        gateway: Option<Ipv4Address>,
        metric: u32,
        iface: Arc<EthernetInterface>,
    ) -> Result<RoutingTableRow> {
        if !netmask.is_netmask() {
            return Err(Error::RouteInvariant(format!(
                "netmask {} is not contiguous",
                netmask
            )));
        }

        if target & netmask != target {
            return Err(Error::RouteInvariant(format!(
                "target {} not allowed with netmask {}",
                target, netmask
            )));
        }

        Ok(RoutingTableRow {
            target,
            netmask,
            gateway,
            metric,
            iface,
        })
    }

    /// Creates a route towards a single host.
    pub fn host(
        target: Ipv4Address,
        gateway: Option<Ipv4Address>,
        metric: u32,
        iface: Arc<EthernetInterface>,
    ) -> RoutingTableRow {
        RoutingTableRow {
            target,
            netmask: Ipv4Address::BROADCAST,
            gateway,
            metric,
            iface,
        }
    }

    pub fn target(&self) -> Ipv4Address {
        self.target
    }

    pub fn netmask(&self) -> Ipv4Address {
        self.netmask
    }

    /// Returns the gateway, or None if the target is directly attached.
    pub fn gateway(&self) -> Option<Ipv4Address> {
        self.gateway
    }

    pub fn metric(&self) -> u32 {
        self.metric
    }

    pub fn iface(&self) -> &Arc<EthernetInterface> {
        &self.iface
    }

    pub fn prefix_len(&self) -> u32 {
        self.netmask.prefix_len()
    }

    /// Checks if an address falls into the routed network.
    pub fn matches(&self, addr: Ipv4Address) -> bool {
        addr & self.netmask == self.target
    }

    /// Returns the address frames towards dst_addr are sent to.
    pub fn next_hop(&self, dst_addr: Ipv4Address) -> Ipv4Address {
        self.gateway.unwrap_or(dst_addr)
    }
}

impl PartialEq for RoutingTableRow {
    fn eq(&self, other: &RoutingTableRow) -> bool {
        self.target == other.target
            && self.netmask == other.netmask
            && self.gateway == other.gateway
            && self.metric == other.metric
            && self.iface.id() == other.iface.id()
    }
}

impl Eq for RoutingTableRow {}

impl Ord for RoutingTableRow {
    /// Orders rows by priority, the most preferred route being the smallest.
    fn cmp(&self, other: &RoutingTableRow) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }

        if self.netmask == other.netmask {
            self.metric
                .cmp(&other.metric)
                .then_with(|| self.target.cmp(&other.target))
                .then_with(|| self.gateway.cmp(&other.gateway))
                .then_with(|| self.iface.id().cmp(&other.iface.id()))
        } else {
            other
                .prefix_len()
                .cmp(&self.prefix_len())
                .then_with(|| other.netmask.cmp(&self.netmask))
        }
    }
}

impl PartialOrd for RoutingTableRow {
    fn partial_cmp(&self, other: &RoutingTableRow) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for RoutingTableRow {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("RoutingTableRow")
            .field("target", &self.target)
            .field("netmask", &self.netmask)
            .field("gateway", &self.gateway)
            .field("metric", &self.metric)
            .field("iface", &self.iface.id())
            .finish()
    }
}

impl Display for RoutingTableRow {
    /// Formats the row as a `route -n` line.
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let gateway = match self.gateway {
            Some(gateway) => gateway.to_string(),
            None => "*".to_string(),
        };
        let flags = if self.gateway.is_some() { "UG" } else { "U" };

        write!(
            f,
            "{:<16}{:<16}{:<16}{:<6}{:<7}{}",
            self.target.to_string(),
            gateway,
            self.netmask.to_string(),
            flags,
            self.metric,
            self.iface.name()
        )
    }
}

/// A set of routes iterated in priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingTable {
    rows: BTreeSet<RoutingTableRow>,
}

impl RoutingTable {
    pub fn new() -> RoutingTable {
        RoutingTable::default()
    }

    /// Adds a route, returning false if a value-equal route already exists.
    pub fn add_route(&mut self, row: RoutingTableRow) -> bool {
        let added = self.rows.insert(row);
        if !added {
            debug!("Ignoring duplicate route.");
        }
        added
    }

    /// Deletes a route, returning false if no value-equal route exists.
    pub fn delete_route(&mut self, row: &RoutingTableRow) -> bool {
        self.rows.remove(row)
    }

    /// Returns the highest priority route matching an address.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<&RoutingTableRow> {
        self.rows.iter().find(|row| row.matches(addr))
    }

    /// Keeps only the routes satisfying a predicate.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&RoutingTableRow) -> bool,
    {
        self.rows.retain(f);
    }

    pub fn contains(&self, row: &RoutingTableRow) -> bool {
        self.rows.contains(row)
    }

    /// Iterates routes from the most to the least preferred.
    pub fn iter(&self) -> impl Iterator<Item = &RoutingTableRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Display for RoutingTable {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(
            f,
            "{:<16}{:<16}{:<16}{:<6}{:<7}{}",
            "Destination", "Gateway", "Genmask", "Flags", "Metric", "Iface"
        )?;
        for row in self.iter() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
