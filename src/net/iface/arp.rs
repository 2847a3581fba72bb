//! Address resolution for an interface.
//!
//! A resolution broadcasts one ARP request per unresolved address, no matter
//! how many callers wait on it. Callers wait on a watch channel completed by
//! the ARP reply, by the resolve timeout, or by the interface going down.

use std::collections::HashMap;

use tokio::sync::watch;
use tokio::time;

use crate::net::repr::{
    Arp,
    EthernetAddress,
    EthernetFrame,
    EthernetPayload,
    Ipv4Address,
    Ipv4Packet,
};
use crate::{
    Error,
    Result,
};

use super::EthernetInterface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Pending,
    Resolved(EthernetAddress),
    TimedOut,
    Cancelled,
}

struct PendingRequest {
    // Distinguishes a request from a later one for the same address.
    generation: u64,
    tx: watch::Sender<Resolution>,
}

#[derive(Default)]
pub(super) struct PendingRequests {
    requests: HashMap<Ipv4Address, PendingRequest>,
    generation: u64,
    // Bumped whenever outstanding resolutions are cancelled.
    epoch: u64,
}

/// How a resolution proceeds once registered.
#[derive(Debug)]
enum Joined {
    Cached(EthernetAddress),
    Waiting {
        rx: watch::Receiver<Resolution>,
        generation: u64,
        send_request: bool,
    },
}

impl EthernetInterface {
    /// Resolves the ethernet address of a neighbor.
    ///
    /// Answers from the ARP cache when possible. Otherwise broadcasts an ARP
    /// request, unless one is already outstanding for the address, and waits
    /// for the reply until the resolve timeout elapses.
    pub async fn resolve(&self, ipv4_addr: Ipv4Address) -> Result<EthernetAddress> {
        let epoch = self.pending.lock().epoch;

        if !self.is_up() {
            return Err(Error::ResolutionCancelled(ipv4_addr));
        }

        if let Some(eth_addr) = self.arp_cache.lock().eth_addr_for_ip(ipv4_addr) {
            return Ok(eth_addr);
        }

        // Without a medium no request can go out, let alone a reply come in.
        if self.medium().is_none() {
            debug!(
                "{}: no medium to resolve {} on.",
                self.name(),
                ipv4_addr
            );
            return Err(Error::ResolutionCancelled(ipv4_addr));
        }

        let (mut rx, generation, send_request) = match self.join_request(ipv4_addr, epoch)? {
            Joined::Cached(eth_addr) => return Ok(eth_addr),
            Joined::Waiting {
                rx,
                generation,
                send_request,
            } => (rx, generation, send_request),
        };

        if send_request {
            self.send_arp_request(ipv4_addr);
        }

        let resolution = time::timeout(self.config.resolve_timeout, async {
            rx.wait_for(|resolution| *resolution != Resolution::Pending)
                .await
                .map(|resolution| *resolution)
        })
        .await;

        match resolution {
            Ok(Ok(Resolution::Resolved(eth_addr))) => Ok(eth_addr),
            Ok(Ok(Resolution::TimedOut)) => Err(Error::ResolutionTimeout(ipv4_addr)),
            Ok(_) => Err(Error::ResolutionCancelled(ipv4_addr)),
            Err(_) => {
                self.expire_request(ipv4_addr, generation);
                info!(
                    "{}: no ARP reply for {} after {:?}.",
                    self.name(),
                    ipv4_addr,
                    self.config.resolve_timeout
                );
                Err(Error::ResolutionTimeout(ipv4_addr))
            }
        }
    }

    /// Registers interest in the resolution of an address, creating the
    /// pending request if there is none.
    ///
    /// Fails if resolutions were cancelled since epoch was read, i.e. the
    /// interface went down or lost its medium in the meantime.
    fn join_request(&self, ipv4_addr: Ipv4Address, epoch: u64) -> Result<Joined> {
        let mut pending = self.pending.lock();

        if pending.epoch != epoch {
            return Err(Error::ResolutionCancelled(ipv4_addr));
        }

        // The reply may have arrived since the caller's lookup.
        if let Some(eth_addr) = self.arp_cache.lock().eth_addr_for_ip(ipv4_addr) {
            return Ok(Joined::Cached(eth_addr));
        }

        let joined = match pending.requests.get(&ipv4_addr) {
            Some(request) => Joined::Waiting {
                rx: request.tx.subscribe(),
                generation: request.generation,
                send_request: false,
            },
            None => {
                pending.generation += 1;
                let generation = pending.generation;
                let (tx, rx) = watch::channel(Resolution::Pending);
                pending
                    .requests
                    .insert(ipv4_addr, PendingRequest { generation, tx });
                Joined::Waiting {
                    rx,
                    generation,
                    send_request: true,
                }
            }
        };

        Ok(joined)
    }

    /// Resolves the next hop and sends an IPv4 packet to it.
    ///
    /// A packet whose next hop does not resolve is dropped and counted.
    pub async fn send_to(&self, packet: Ipv4Packet, next_hop: Ipv4Address) -> Result<()> {
        match self.resolve(next_hop).await {
            Ok(eth_addr) => {
                self.transmit(EthernetFrame::new(
                    self.ethernet_addr,
                    eth_addr,
                    EthernetPayload::Ipv4(packet),
                ));
                Ok(())
            }
            Err(err) => {
                info!(
                    "{}: dropping packet for {}, {}.",
                    self.name(),
                    packet.dst_addr(),
                    err
                );
                self.counters.lock().tx_dropped += 1;
                Err(err)
            }
        }
    }

    /// Returns the cached ethernet address of a neighbor without refreshing
    /// the entry.
    pub fn arp_lookup(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.arp_cache.lock().peek(ipv4_addr)
    }

    /// Adds a static mapping to the ARP cache.
    pub fn arp_insert(&self, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) {
        self.learn(ipv4_addr, eth_addr);
    }

    /// Returns the ARP cache contents ordered by IPv4 address.
    pub fn arp_entries(&self) -> Vec<(Ipv4Address, EthernetAddress)> {
        self.arp_cache.lock().entries()
    }

    /// Returns the number of addresses with an outstanding ARP request.
    pub fn pending_resolutions(&self) -> usize {
        self.pending.lock().requests.len()
    }

    pub(super) fn recv_arp_request(&self, arp: &Arp) {
        if self.inet_addr() != Some(arp.target_proto_addr()) {
            debug!(
                "{}: ignoring ARP request for {}.",
                self.name(),
                arp.target_proto_addr()
            );
            return;
        }

        debug!(
            "{}: answering ARP request from {}.",
            self.name(),
            arp.requester_hw_addr()
        );
        let reply = Arp::reply(arp, self.ethernet_addr);
        self.transmit(EthernetFrame::new(
            self.ethernet_addr,
            arp.requester_hw_addr(),
            EthernetPayload::Arp(reply),
        ));
    }

    pub(super) fn recv_arp_reply(&self, arp: &Arp) {
        if let Some(eth_addr) = arp.resolved_hw_addr() {
            self.learn(arp.target_proto_addr(), eth_addr);
        }
    }

    /// Stores a mapping and completes any resolution waiting for it.
    fn learn(&self, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) {
        debug!("{}: {} is at {}.", self.name(), ipv4_addr, eth_addr);

        if let Some((evicted, _)) = self.arp_cache.lock().set_eth_addr_for_ip(ipv4_addr, eth_addr) {
            debug!("{}: evicted {} from the ARP cache.", self.name(), evicted);
        }

        if let Some(request) = self.pending.lock().requests.remove(&ipv4_addr) {
            request.tx.send_replace(Resolution::Resolved(eth_addr));
        }
    }

    fn send_arp_request(&self, ipv4_addr: Ipv4Address) {
        debug!("{}: who has {}?", self.name(), ipv4_addr);

        let request = Arp::request(self.ethernet_addr, ipv4_addr);
        self.transmit(EthernetFrame::new(
            self.ethernet_addr,
            EthernetAddress::BROADCAST,
            EthernetPayload::Arp(request),
        ));
    }

    fn expire_request(&self, ipv4_addr: Ipv4Address, generation: u64) {
        let mut pending = self.pending.lock();

        let expired = pending
            .requests
            .get(&ipv4_addr)
            .map_or(false, |request| request.generation == generation);

        if expired {
            if let Some(request) = pending.requests.remove(&ipv4_addr) {
                request.tx.send_replace(Resolution::TimedOut);
            }
        }
    }

    /// Fails every outstanding resolution.
    pub(super) fn cancel_resolutions(&self) {
        let requests: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.epoch += 1;
            pending.requests.drain().collect()
        };

        for (ipv4_addr, request) in requests {
            debug!("{}: cancelling resolution of {}.", self.name(), ipv4_addr);
            request.tx.send_replace(Resolution::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::net::{
        EthernetInterface,
        IdGenerator,
        InterfaceConfig,
        Medium,
        Status,
    };

    use super::*;

    fn iface(ids: &IdGenerator, mac: u8, addr: &str) -> Arc<EthernetInterface> {
        let iface = EthernetInterface::new(
            ids,
            EthernetAddress::new([0x02, 0, 0, 0, 0, mac]),
            &format!("eth{}", mac),
            InterfaceConfig::default().with_resolve_timeout(Duration::from_millis(50)),
        );
        iface.set_inet_addr(Some(addr.parse().unwrap())).unwrap();
        iface.set_status(Status::Up).unwrap();
        iface
    }

    #[tokio::test]
    async fn test_resolve_while_down() {
        let ids = IdGenerator::new();
        let a = iface(&ids, 1, "10.0.0.1");
        a.set_status(Status::Down).unwrap();

        assert_matches!(
            a.resolve(Ipv4Address::new([10, 0, 0, 2])).await,
            Err(Error::ResolutionCancelled(_))
        );
    }

    #[tokio::test]
    async fn test_resolve_cached() {
        let ids = IdGenerator::new();
        let a = iface(&ids, 1, "10.0.0.1");
        let eth_addr = EthernetAddress::new([0x02, 0, 0, 0, 0, 9]);
        a.arp_insert(Ipv4Address::new([10, 0, 0, 9]), eth_addr);

        assert_eq!(
            a.resolve(Ipv4Address::new([10, 0, 0, 9])).await.unwrap(),
            eth_addr
        );
        assert_eq!(a.counters().tx_packets, 0);
    }

    #[tokio::test]
    async fn test_resolve_over_medium() {
        let ids = IdGenerator::new();
        let medium = Medium::new(&ids);
        let a = iface(&ids, 1, "10.0.0.1");
        let b = iface(&ids, 2, "10.0.0.2");
        a.connect_medium(&medium);
        b.connect_medium(&medium);

        assert_eq!(
            a.resolve(Ipv4Address::new([10, 0, 0, 2])).await.unwrap(),
            b.ethernet_addr()
        );
        assert_eq!(a.pending_resolutions(), 0);
        assert_eq!(
            a.arp_entries(),
            vec![(Ipv4Address::new([10, 0, 0, 2]), b.ethernet_addr())]
        );
    }

    #[tokio::test]
    async fn test_resolve_times_out() {
        let ids = IdGenerator::new();
        let medium = Medium::new(&ids);
        let a = iface(&ids, 1, "10.0.0.1");
        a.connect_medium(&medium);

        assert_matches!(
            a.resolve(Ipv4Address::new([10, 0, 0, 7])).await,
            Err(Error::ResolutionTimeout(_))
        );
        assert_eq!(a.pending_resolutions(), 0);
        assert_eq!(a.counters().tx_packets, 1);
    }

    #[tokio::test]
    async fn test_send_to_unresolved_counts_drop() {
        let ids = IdGenerator::new();
        let medium = Medium::new(&ids);
        let a = iface(&ids, 1, "10.0.0.1");
        a.connect_medium(&medium);

        let packet = Ipv4Packet::new(
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::new([10, 0, 0, 7]),
            vec![],
        );
        assert_matches!(
            a.send_to(packet, Ipv4Address::new([10, 0, 0, 7])).await,
            Err(Error::ResolutionTimeout(_))
        );
        assert_eq!(a.counters().tx_dropped, 1);
    }

    #[tokio::test]
    async fn test_send_to_without_medium() {
        let ids = IdGenerator::new();
        let a = iface(&ids, 1, "10.0.0.1");

        let packet = Ipv4Packet::new(
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::new([10, 0, 0, 7]),
            vec![],
        );
        let sent = time::timeout(
            Duration::from_millis(25),
            a.send_to(packet, Ipv4Address::new([10, 0, 0, 7])),
        )
        .await;

        assert_matches!(sent, Ok(Err(Error::ResolutionCancelled(_))));
        assert_eq!(a.pending_resolutions(), 0);
        assert_eq!(a.counters().tx_packets, 0);
        assert_eq!(a.counters().tx_errors, 0);
        assert_eq!(a.counters().tx_dropped, 1);
    }

    #[test]
    fn test_join_after_cancellation() {
        let ids = IdGenerator::new();
        let a = iface(&ids, 1, "10.0.0.1");
        let target = Ipv4Address::new([10, 0, 0, 7]);

        let epoch = a.pending.lock().epoch;
        a.cancel_resolutions();

        assert_matches!(
            a.join_request(target, epoch),
            Err(Error::ResolutionCancelled(_))
        );
        assert_eq!(a.pending_resolutions(), 0);

        let epoch = a.pending.lock().epoch;
        assert_matches!(
            a.join_request(target, epoch),
            Ok(Joined::Waiting { send_request: true, .. })
        );
        assert_matches!(
            a.join_request(target, epoch),
            Ok(Joined::Waiting { send_request: false, .. })
        );
        assert_eq!(a.pending_resolutions(), 1);
    }

    #[test]
    fn test_unsolicited_reply_is_learned() {
        let ids = IdGenerator::new();
        let a = iface(&ids, 1, "10.0.0.1");
        let eth_addr = EthernetAddress::new([0x02, 0, 0, 0, 0, 2]);

        let request = Arp::request(a.ethernet_addr(), Ipv4Address::new([10, 0, 0, 2]));
        a.receive(&EthernetFrame::new(
            eth_addr,
            a.ethernet_addr(),
            EthernetPayload::Arp(Arp::reply(&request, eth_addr)),
        ));

        assert_eq!(a.arp_lookup(Ipv4Address::new([10, 0, 0, 2])), Some(eth_addr));
        assert_eq!(a.counters().rx_packets, 1);
    }
}
