use std::io::{
    Cursor,
    Write,
};

use byteorder::{
    NetworkEndian,
    WriteBytesExt,
};

use crate::net::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::{
    Error,
    Result,
};

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-1
pub enum Op {
    Request = 0x0001,
    Reply = 0x0002,
}

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-2
pub enum HwType {
    Ethernet = 0x0001,
}

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-3
pub enum ProtoType {
    Ipv4 = 0x0800,
}

/// An Ethernet/IPv4 ARP message.
///
/// Requests carry the requester's MAC and the IPv4 address to resolve. Replies
/// carry the same fields plus the MAC the address resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arp {
    op: Op,
    requester_hw_addr: EthernetAddress,
    target_proto_addr: Ipv4Address,
    resolved_hw_addr: Option<EthernetAddress>,
}

impl Arp {
    /// Creates an ARP message.
    ///
    /// # Panics
    ///
    /// Panics when creating a reply without a resolved address, or a request
    /// with one.
    pub fn new(
        op: Op,
        requester_hw_addr: EthernetAddress,
        target_proto_addr: Ipv4Address,
        resolved_hw_addr: Option<EthernetAddress>,
    ) -> Arp {
        match (op, resolved_hw_addr) {
            (Op::Reply, None) => {
                panic!("ARP reply for {} lacks a resolved address", target_proto_addr)
            }
            (Op::Request, Some(_)) => {
                panic!("ARP request for {} carries a resolved address", target_proto_addr)
            }
            _ => {}
        }

        Arp {
            op,
            requester_hw_addr,
            target_proto_addr,
            resolved_hw_addr,
        }
    }

    /// Creates a request asking who owns target_proto_addr.
    pub fn request(requester_hw_addr: EthernetAddress, target_proto_addr: Ipv4Address) -> Arp {
        Arp::new(Op::Request, requester_hw_addr, target_proto_addr, None)
    }

    /// Creates the reply answering a request with resolved_hw_addr.
    pub fn reply(request: &Arp, resolved_hw_addr: EthernetAddress) -> Arp {
        Arp::new(
            Op::Reply,
            request.requester_hw_addr,
            request.target_proto_addr,
            Some(resolved_hw_addr),
        )
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn requester_hw_addr(&self) -> EthernetAddress {
        self.requester_hw_addr
    }

    pub fn target_proto_addr(&self) -> Ipv4Address {
        self.target_proto_addr
    }

    /// Returns the resolved MAC, which is only present on replies.
    pub fn resolved_hw_addr(&self) -> Option<EthernetAddress> {
        self.resolved_hw_addr
    }

    /// Returns the size of the ARP packet when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        28
    }

    /// Serializes the ARP packet into a buffer.
    ///
    /// Replies are written from the point of view of the responder, i.e. the
    /// sender fields hold the resolved pair and the target fields the requester.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if self.buffer_len() > buffer.len() {
            return Err(Error::Exhausted);
        }

        let (sender_hw_addr, sender_proto_addr, target_hw_addr, target_proto_addr) =
            match self.resolved_hw_addr {
                Some(resolved_hw_addr) => (
                    resolved_hw_addr,
                    self.target_proto_addr,
                    self.requester_hw_addr,
                    Ipv4Address::UNSPECIFIED,
                ),
                None => (
                    self.requester_hw_addr,
                    Ipv4Address::UNSPECIFIED,
                    EthernetAddress::new([0; 6]),
                    self.target_proto_addr,
                ),
            };

        let mut writer = Cursor::new(&mut buffer[.. 28]);
        write_fields(
            &mut writer,
            self.op,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr,
            target_proto_addr,
        )
        .map_err(|_| Error::Exhausted)
    }
}

fn write_fields<W: Write>(
    writer: &mut W,
    op: Op,
    sender_hw_addr: EthernetAddress,
    sender_proto_addr: Ipv4Address,
    target_hw_addr: EthernetAddress,
    target_proto_addr: Ipv4Address,
) -> std::io::Result<()> {
    writer.write_u16::<NetworkEndian>(HwType::Ethernet as u16)?;
    writer.write_u16::<NetworkEndian>(ProtoType::Ipv4 as u16)?;
    writer.write_u8(6)?;
    writer.write_u8(4)?;
    writer.write_u16::<NetworkEndian>(op as u16)?;
    writer.write_all(sender_hw_addr.as_bytes())?;
    writer.write_all(&sender_proto_addr.octets())?;
    writer.write_all(target_hw_addr.as_bytes())?;
    writer.write_all(&target_proto_addr.octets())
}
