use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};
use rand::Rng;

use crate::net::repr::{
    Arp,
    Ipv4Packet,
};
use crate::{
    Error,
    Result,
};

/// [MAC address](https://en.wikipedia.org/wiki/MAC_address) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 6]);

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);

    /// Creates a MAC address from a network byte order buffer.
    pub const fn new(addr: [u8; 6]) -> Address {
        Address(addr)
    }

    /// Creates a random, locally administered unicast address.
    pub fn random() -> Address {
        let mut addr: [u8; 6] = rand::thread_rng().gen();
        addr[0] = (addr[0] | 0b00000010) & !0b00000001;
        Address(addr)
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a 48 bit integer.
    pub fn to_u64(&self) -> u64 {
        self.0
            .iter()
            .fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
    }

    // Checks if this is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_multicast() || self.is_broadcast())
    }

    // Checks if this is a multicast address.
    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0b00000001) > 0
    }

    /// Checks if this is a broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Checks if this is a locally assigned address or OUI assigned by IEEE.
    pub fn is_local(&self) -> bool {
        (self.0[0] & 0b00000010) > 0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses a MAC address from an A:B:C:D:E:F style string.
    fn from_str(addr: &str) -> Result<Address> {
        let malformed = || Error::AddressFormat(addr.to_string());

        let mut mac: [u8; 6] = [0; 6];
        let mut tokens = addr.split(':');

        for byte in mac.iter_mut() {
            let token = tokens.next().ok_or_else(malformed)?;
            let is_hex = token.bytes().all(|c| c.is_ascii_hexdigit());
            if token.is_empty() || token.len() > 2 || !is_hex {
                return Err(malformed());
            }
            *byte = u8::from_str_radix(token, 16).map_err(|_| malformed())?;
        }

        if tokens.next().is_some() {
            return Err(malformed());
        }

        Ok(Address::new(mac))
    }
}

/// [https://en.wikipedia.org/wiki/EtherType](https://en.wikipedia.org/wiki/EtherType)
pub mod eth_types {
    pub const IPV4: u16 = 0x800;

    pub const ARP: u16 = 0x806;
}

/// Contents of an Ethernet frame, tagged by protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Arp(Arp),
    Ipv4(Ipv4Packet),
    /// A protocol the simulation does not speak.
    Unknown { eth_type: u16, data: Vec<u8> },
}

impl Payload {
    /// Returns the EtherType tag of the payload.
    pub fn eth_type(&self) -> u16 {
        match *self {
            Payload::Arp(_) => eth_types::ARP,
            Payload::Ipv4(_) => eth_types::IPV4,
            Payload::Unknown { eth_type, .. } => eth_type,
        }
    }

    pub fn buffer_len(&self) -> usize {
        match *self {
            Payload::Arp(ref arp) => arp.buffer_len(),
            Payload::Ipv4(ref packet) => packet.buffer_len(),
            Payload::Unknown { ref data, .. } => data.len(),
        }
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        match *self {
            Payload::Arp(ref arp) => arp.serialize(buffer),
            Payload::Ipv4(ref packet) => packet.serialize(buffer),
            Payload::Unknown { ref data, .. } => {
                if data.len() > buffer.len() {
                    return Err(Error::Exhausted);
                }
                buffer[.. data.len()].copy_from_slice(data);
                Ok(())
            }
        }
    }
}

mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const DST_ADDR: Range<usize> = 0 .. 6;

    pub const SRC_ADDR: Range<usize> = 6 .. 12;

    pub const PAYLOAD_TYPE: Range<usize> = 12 .. 14;

    pub const PAYLOAD: RangeFrom<usize> = 14 ..;
}

/// A link layer frame exchanged over a medium.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    src_addr: Address,
    dst_addr: Address,
    payload: Payload,
}

impl Frame {
    pub const HEADER_LEN: usize = 14;

    pub fn new(src_addr: Address, dst_addr: Address, payload: Payload) -> Frame {
        Frame {
            src_addr,
            dst_addr,
            payload,
        }
    }

    /// Tries to create a frame from textual source and destination addresses.
    pub fn try_new(src_addr: &str, dst_addr: &str, payload: Payload) -> Result<Frame> {
        Ok(Frame::new(src_addr.parse()?, dst_addr.parse()?, payload))
    }

    pub fn src_addr(&self) -> Address {
        self.src_addr
    }

    pub fn dst_addr(&self) -> Address {
        self.dst_addr
    }

    pub fn payload_type(&self) -> u16 {
        self.payload.eth_type()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Returns the length of the frame when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        Self::HEADER_LEN + self.payload.buffer_len()
    }

    /// Serializes the frame into a buffer in Ethernet II layout.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if self.buffer_len() > buffer.len() {
            return Err(Error::Exhausted);
        }

        buffer[fields::DST_ADDR].copy_from_slice(self.dst_addr.as_bytes());
        buffer[fields::SRC_ADDR].copy_from_slice(self.src_addr.as_bytes());
        NetworkEndian::write_u16(&mut buffer[fields::PAYLOAD_TYPE], self.payload_type());
        self.payload.serialize(&mut buffer[fields::PAYLOAD])
    }

    /// Serializes the frame into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0; self.buffer_len()];
        self.serialize(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::repr::Ipv4Address;

    #[test]
    fn test_is_unicast() {
        let addr = Address::new([0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(addr.is_unicast());
    }

    #[test]
    fn test_is_multicast() {
        let addr = Address::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]);
        assert!(addr.is_multicast());
        assert!(!addr.is_broadcast());
    }

    #[test]
    fn test_is_broadcast() {
        let addr = Address::new([0xFF; 6]);
        assert!(addr.is_broadcast());
        assert!(!Address::new([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]).is_broadcast());
    }

    #[test]
    fn test_is_local() {
        let addr = Address::new([0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(addr.is_local());
    }

    #[test]
    fn test_random_is_local_unicast() {
        for _ in 0 .. 32 {
            let addr = Address::random();
            assert!(addr.is_local());
            assert!(addr.is_unicast());
        }
    }

    #[test]
    fn test_parse() {
        let addr: Address = "00:1a:2B:3c:4D:5e".parse().unwrap();
        assert_eq!(addr, Address::new([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]));
        assert_eq!(addr.to_string(), "00:1A:2B:3C:4D:5E");
        assert_eq!(addr.to_u64(), 0x001A_2B3C_4D5E);
        assert_eq!("FF:FF:FF:FF:FF:FF".parse::<Address>().unwrap(), Address::BROADCAST);
    }

    #[test]
    fn test_parse_malformed() {
        let malformed = [
            "",
            "00:11:22:33:44",
            "00:11:22:33:44:55:66",
            "00:11:22:33:44:GG",
            "001:1:22:33:44:55",
        ];
        for addr in &malformed {
            assert_matches!(addr.parse::<Address>(), Err(Error::AddressFormat(_)));
        }
    }

    #[test]
    fn test_try_new_malformed() {
        let payload = Payload::Unknown {
            eth_type: 0x88B5,
            data: vec![],
        };
        assert_matches!(
            Frame::try_new("00:00:00:00:00:01", "nope", payload.clone()),
            Err(Error::AddressFormat(_))
        );
        assert!(Frame::try_new("00:00:00:00:00:01", "FF:FF:FF:FF:FF:FF", payload).is_ok());
    }

    #[test]
    fn test_serialize() {
        let src = Address::new([0, 0, 0, 0, 0, 1]);
        let arp = Arp::request(src, Ipv4Address::new([10, 0, 0, 2]));
        let frame = Frame::new(src, Address::BROADCAST, Payload::Arp(arp));

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(bytes.len(), 42);
        assert_eq!(&bytes[0 .. 6], Address::BROADCAST.as_bytes());
        assert_eq!(&bytes[6 .. 12], src.as_bytes());
        assert_eq!(&bytes[12 .. 14], &[0x08, 0x06]);
        assert_eq!(frame.payload_type(), eth_types::ARP);
    }
}
