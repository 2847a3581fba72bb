use std::collections::HashMap;

use crate::net::repr::{
    EthernetAddress,
    Ipv4Address,
};

struct Entry {
    eth_addr: EthernetAddress,
    last_used: u64,
}

/// Maintains a bounded set of IPv4 -> ethernet address mappings.
///
/// Once full, inserting a new mapping evicts the least recently used one.
pub struct ArpCache {
    entries: HashMap<Ipv4Address, Entry>,
    capacity: usize,
    clock: u64,
}

impl ArpCache {
    /// Creates an ARP cache holding at most capacity mappings. A cache always
    /// holds at least one mapping.
    pub fn new(capacity: usize) -> ArpCache {
        let capacity = capacity.max(1);

        ArpCache {
            entries: HashMap::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    /// Lookup the ethernet address for an IPv4 address, marking it as used.
    pub fn eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        let now = self.tick();

        self.entries.get_mut(&ipv4_addr).map(|entry| {
            entry.last_used = now;
            entry.eth_addr
        })
    }

    /// Lookup the ethernet address for an IPv4 address without marking it as
    /// used.
    pub fn peek(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.entries.get(&ipv4_addr).map(|entry| entry.eth_addr)
    }

    /// Create or update the ethernet address mapping for an IPv4 address.
    ///
    /// Returns the mapping evicted to make room, if any.
    pub fn set_eth_addr_for_ip(
        &mut self,
        ipv4_addr: Ipv4Address,
        eth_addr: EthernetAddress,
    ) -> Option<(Ipv4Address, EthernetAddress)> {
        let last_used = self.tick();

        if let Some(entry) = self.entries.get_mut(&ipv4_addr) {
            entry.eth_addr = eth_addr;
            entry.last_used = last_used;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_least_recently_used()
        } else {
            None
        };

        self.entries.insert(
            ipv4_addr,
            Entry {
                eth_addr,
                last_used,
            },
        );

        evicted
    }

    /// Removes the mapping for an IPv4 address.
    pub fn remove(&mut self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.entries.remove(&ipv4_addr).map(|entry| entry.eth_addr)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns all mappings ordered by IPv4 address.
    pub fn entries(&self) -> Vec<(Ipv4Address, EthernetAddress)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(ipv4_addr, entry)| (*ipv4_addr, entry.eth_addr))
            .collect();
        entries.sort();
        entries
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recently_used(&mut self) -> Option<(Ipv4Address, EthernetAddress)> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(ipv4_addr, _)| *ipv4_addr)?;

        self.entries
            .remove(&oldest)
            .map(|entry| (oldest, entry.eth_addr))
    }
}
