use crate::net::repr::{
    ArpOp,
    EthernetFrame,
    EthernetPayload,
};

use super::EthernetInterface;

impl EthernetInterface {
    /// Processes a frame delivered by the medium.
    ///
    /// Frames are ignored while the interface is down. Frames addressed to
    /// another station are observed but otherwise dropped without counting.
    pub fn receive(&self, frame: &EthernetFrame) {
        if !self.is_up() {
            return;
        }

        self.observers.received(frame);

        let dst_addr = frame.dst_addr();
        if dst_addr != self.ethernet_addr && !dst_addr.is_broadcast() {
            debug!(
                "{}: ignoring frame from {} to {}.",
                self.name(),
                frame.src_addr(),
                dst_addr
            );
            return;
        }

        match *frame.payload() {
            EthernetPayload::Arp(ref arp) => {
                self.count_rx(frame);
                match arp.op() {
                    ArpOp::Request => self.recv_arp_request(arp),
                    ArpOp::Reply => self.recv_arp_reply(arp),
                }
            }
            EthernetPayload::Ipv4(ref packet) => match self.router() {
                Some(router) => {
                    self.count_rx(frame);
                    router.receive(packet.clone());
                }
                None => {
                    debug!(
                        "{}: no router for packet to {}, dropping it.",
                        self.name(),
                        packet.dst_addr()
                    );
                    self.counters.lock().rx_dropped += 1;
                }
            },
            EthernetPayload::Unknown { eth_type, .. } => {
                debug!(
                    "{}: unknown ether type 0x{:04x} from {}.",
                    self.name(),
                    eth_type,
                    frame.src_addr()
                );
                self.counters.lock().rx_errors += 1;
            }
        }
    }

    /// Sends a frame out on the medium.
    ///
    /// Counters and observers see the frame before it reaches any receiver.
    /// Frames are dropped while the interface is down and counted as errors
    /// while it has no medium.
    pub fn transmit(&self, frame: EthernetFrame) {
        if !self.is_up() {
            return;
        }

        let medium = match self.medium() {
            Some(medium) => medium,
            None => {
                debug!(
                    "{}: no medium for frame to {}, dropping it.",
                    self.name(),
                    frame.dst_addr()
                );
                self.counters.lock().tx_errors += 1;
                return;
            }
        };

        {
            let mut counters = self.counters.lock();
            counters.tx_packets += 1;
            counters.tx_bytes += frame.buffer_len() as u64;
        }

        self.observers.transmitted(&frame);
        medium.transmit(self.id, frame);
    }

    fn count_rx(&self, frame: &EthernetFrame) {
        let mut counters = self.counters.lock();
        counters.rx_packets += 1;
        counters.rx_bytes += frame.buffer_len() as u64;
    }
}
