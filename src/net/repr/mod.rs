//! Addresses and messages exchanged by simulated devices.
//!
//! The `repr` module provides the value types frames are built from: MAC and
//! IPv4 addresses, ARP messages, IPv4 packets and the Ethernet frame wrapping
//! them, along with their serialization to byte buffers.

pub mod arp;
pub mod ethernet;
pub mod ipv4;

pub use self::arp::{
    Arp,
    Op as ArpOp,
};
pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
    Payload as EthernetPayload,
};
pub use self::ipv4::{
    protocols as ipv4_protocols,
    Address as Ipv4Address,
    Class as Ipv4Class,
    Packet as Ipv4Packet,
};
