//! A small simulated internetwork.
//!
//! Interfaces attach to shared media and to routers; frames really traverse the
//! media, ARP caches really populate and routes really compete by prefix length
//! and metric. Presentation layers drive the simulation through the types in
//! [`net`] and observe it through [`net::TransferObserver`].

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod net;

use thiserror::Error;

use crate::net::repr::Ipv4Address;

#[derive(Debug, Error)]
pub enum Error {
    /// Indicates textual address input that could not be parsed.
    #[error("malformed address {0:?}")]
    AddressFormat(String),
    /// Indicates interface address settings which are inconsistent.
    #[error("address configuration rejected: {0}")]
    AddressConfiguration(String),
    /// Indicates a routing table row whose target lies outside its netmask.
    #[error("route rejected: {0}")]
    RouteInvariant(String),
    /// Indicates an address which was not resolved in the allotted time.
    #[error("timed out resolving {0}")]
    ResolutionTimeout(Ipv4Address),
    /// Indicates an address resolution abandoned because the interface went
    /// down or lost its medium.
    #[error("resolution of {0} cancelled")]
    ResolutionCancelled(Ipv4Address),
    /// Indicates that no routing table row matches a destination.
    #[error("no route to host {0}")]
    NoRoute(Ipv4Address),
    /// Indicates a packet whose TTL ran out while being forwarded.
    #[error("TTL expired in transit to {0}")]
    TtlExpired(Ipv4Address),
    /// Indicates a buffer too small to serialize into.
    #[error("buffer exhausted")]
    Exhausted,
}

pub type Result<T> = std::result::Result<T, Error>;
