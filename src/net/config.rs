//! Tunables of simulated devices.

use std::time::Duration;

/// Default number of entries an interface ARP cache holds.
pub const DEFAULT_ARP_CACHE_CAPACITY: usize = 10;

/// Default time an interface waits for an ARP reply.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Metric of the route an interface installs for its own network.
pub const DIRECT_ROUTE_METRIC: u32 = 1;

/// TTL of newly created IPv4 packets.
pub const DEFAULT_TTL: u8 = 64;

/// Number of locally delivered packets a router keeps for its owner.
pub const ROUTER_INBOX_CAPACITY: usize = 1024;

/// Settings fixed when an interface is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Maximum number of IPv4 -> MAC mappings cached by the interface.
    pub arp_cache_capacity: usize,
    /// How long address resolution waits for an ARP reply before giving up.
    pub resolve_timeout: Duration,
}

impl InterfaceConfig {
    pub fn with_arp_cache_capacity(mut self, arp_cache_capacity: usize) -> InterfaceConfig {
        self.arp_cache_capacity = arp_cache_capacity;
        self
    }

    pub fn with_resolve_timeout(mut self, resolve_timeout: Duration) -> InterfaceConfig {
        self.resolve_timeout = resolve_timeout;
        self
    }
}

impl Default for InterfaceConfig {
    fn default() -> InterfaceConfig {
        InterfaceConfig {
            arp_cache_capacity: DEFAULT_ARP_CACHE_CAPACITY,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}
