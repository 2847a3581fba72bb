use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::io::{
    Cursor,
    Write,
};
use std::net::Ipv4Addr;
use std::ops::{
    BitAnd,
    BitOr,
    Not,
};
use std::str::FromStr;

use byteorder::{
    NetworkEndian,
    WriteBytesExt,
};

use crate::net::check::internet_checksum;
use crate::net::config::DEFAULT_TTL;
use crate::{
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) held as its integer value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u32);

/// Classful network of an address, only used to infer default netmasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    A,
    B,
    C,
}

impl Address {
    pub const UNSPECIFIED: Address = Address(0);

    pub const BROADCAST: Address = Address(0xFFFF_FFFF);

    /// Creates an IPv4 address from a network byte order buffer.
    pub const fn new(addr: [u8; 4]) -> Address {
        Address(u32::from_be_bytes(addr))
    }

    /// Creates an IPv4 address from its integer value.
    pub const fn from_u32(addr: u32) -> Address {
        Address(addr)
    }

    /// Creates a contiguous netmask with prefix_len leading ones.
    ///
    /// # Panics
    ///
    /// Panics if prefix_len exceeds 32.
    pub fn netmask(prefix_len: u32) -> Address {
        assert!(prefix_len <= 32, "prefix length {} exceeds 32", prefix_len);
        Address(u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0))
    }

    pub fn to_u32(&self) -> u32 {
        self.0
    }

    /// Returns the network byte order representation of the address.
    pub fn octets(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Returns the classful network the address falls into, if any.
    pub fn class(&self) -> Option<Class> {
        if self.0 >> 31 == 0b0 {
            Some(Class::A)
        } else if self.0 >> 30 == 0b10 {
            Some(Class::B)
        } else if self.0 >> 29 == 0b110 {
            Some(Class::C)
        } else {
            None
        }
    }

    pub fn is_class_a(&self) -> bool {
        self.class() == Some(Class::A)
    }

    pub fn is_class_b(&self) -> bool {
        self.class() == Some(Class::B)
    }

    pub fn is_class_c(&self) -> bool {
        self.class() == Some(Class::C)
    }

    /// Infers a netmask from the address class (/8, /16 or /24).
    pub fn default_netmask(&self) -> Option<Address> {
        self.class().map(|class| match class {
            Class::A => Address::netmask(8),
            Class::B => Address::netmask(16),
            Class::C => Address::netmask(24),
        })
    }

    /// Checks if the address consists of contiguous leading ones.
    pub fn is_netmask(&self) -> bool {
        self.0.leading_ones() == self.0.count_ones()
    }

    /// Returns the number of set bits, i.e. the prefix length of a netmask.
    pub fn prefix_len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the network address of this address under a netmask.
    pub fn network(&self, netmask: Address) -> Address {
        *self & netmask
    }

    /// Returns the directed broadcast address of this address under a netmask.
    pub fn broadcast(&self, netmask: Address) -> Address {
        *self | !netmask
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Address::BROADCAST
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Address::UNSPECIFIED
    }
}

impl BitAnd for Address {
    type Output = Address;

    fn bitand(self, rhs: Address) -> Address {
        Address(self.0 & rhs.0)
    }
}

impl BitOr for Address {
    type Output = Address;

    fn bitor(self, rhs: Address) -> Address {
        Address(self.0 | rhs.0)
    }
}

impl Not for Address {
    type Output = Address;

    fn not(self) -> Address {
        Address(!self.0)
    }
}

impl From<[u8; 4]> for Address {
    fn from(addr: [u8; 4]) -> Address {
        Address::new(addr)
    }
}

impl From<u32> for Address {
    fn from(addr: u32) -> Address {
        Address(addr)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.0
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Address {
        Address::new(addr.octets())
    }
}

impl From<Address> for Ipv4Addr {
    fn from(addr: Address) -> Ipv4Addr {
        Ipv4Addr::from(addr.octets())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses an IPv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> Result<Address> {
        let malformed = || Error::AddressFormat(addr.to_string());

        let mut ipv4: [u8; 4] = [0; 4];
        let mut tokens = addr.split('.');

        for byte in ipv4.iter_mut() {
            let token = tokens.next().ok_or_else(malformed)?;
            if token.is_empty() || !token.bytes().all(|c| c.is_ascii_digit()) {
                return Err(malformed());
            }
            *byte = token.parse::<u8>().map_err(|_| malformed())?;
        }

        if tokens.next().is_some() {
            return Err(malformed());
        }

        Ok(Address::new(ipv4))
    }
}

/// <https://www.iana.org/assignments/protocol-numbers>
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;

    /// Reserved for experimentation, used for opaque simulated payloads.
    pub const EXPERIMENTAL: u8 = 253;
}

/// An IPv4 packet with an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    src_addr: Address,
    dst_addr: Address,
    ttl: u8,
    protocol: u8,
    payload: Vec<u8>,
}

impl Packet {
    pub const HEADER_LEN: usize = 20;

    /// Creates a packet with the default TTL and an experimental protocol.
    pub fn new(src_addr: Address, dst_addr: Address, payload: Vec<u8>) -> Packet {
        Packet {
            src_addr,
            dst_addr,
            ttl: DEFAULT_TTL,
            protocol: protocols::EXPERIMENTAL,
            payload,
        }
    }

    pub fn with_ttl(mut self, ttl: u8) -> Packet {
        self.ttl = ttl;
        self
    }

    pub fn with_protocol(mut self, protocol: u8) -> Packet {
        self.protocol = protocol;
        self
    }

    pub fn src_addr(&self) -> Address {
        self.src_addr
    }

    pub fn dst_addr(&self) -> Address {
        self.dst_addr
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decrements the TTL for forwarding, returning false once it runs out.
    pub fn hop(&mut self) -> bool {
        if self.ttl <= 1 {
            self.ttl = 0;
            false
        } else {
            self.ttl -= 1;
            true
        }
    }

    /// Returns the size of the packet when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        Self::HEADER_LEN + self.payload.len()
    }

    /// Serializes the packet into a buffer.
    ///
    /// You should ensure buffer has at least buffer_len() bytes to avoid errors.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        let packet_len = self.buffer_len();
        if packet_len > buffer.len() || packet_len > u16::MAX as usize {
            return Err(Error::Exhausted);
        }

        {
            let mut writer = Cursor::new(&mut buffer[.. Self::HEADER_LEN]);
            writer.write_u8(0x45).map_err(|_| Error::Exhausted)?;
            writer.write_u8(0).map_err(|_| Error::Exhausted)?;
            writer
                .write_u16::<NetworkEndian>(packet_len as u16)
                .map_err(|_| Error::Exhausted)?;
            // Identification, flags and fragment offset stay zero.
            writer
                .write_u32::<NetworkEndian>(0)
                .map_err(|_| Error::Exhausted)?;
            writer.write_u8(self.ttl).map_err(|_| Error::Exhausted)?;
            writer.write_u8(self.protocol).map_err(|_| Error::Exhausted)?;
            writer
                .write_u16::<NetworkEndian>(0)
                .map_err(|_| Error::Exhausted)?;
            writer
                .write_all(&self.src_addr.octets())
                .map_err(|_| Error::Exhausted)?;
            writer
                .write_all(&self.dst_addr.octets())
                .map_err(|_| Error::Exhausted)?;
        }

        let checksum = internet_checksum(&buffer[.. Self::HEADER_LEN]);
        buffer[10 .. 12].copy_from_slice(&checksum.to_be_bytes());
        buffer[Self::HEADER_LEN .. packet_len].copy_from_slice(&self.payload);

        Ok(())
    }
}
