//! Core, platform independent simulation code.

pub mod arp_cache;
pub mod check;
pub mod config;
pub mod id;
pub mod iface;
pub mod medium;
pub mod observer;
pub mod repr;
pub mod router;
pub mod routing_table;

pub use self::arp_cache::ArpCache;
pub use self::config::InterfaceConfig;
pub use self::id::{
    Id,
    IdGenerator,
};
pub use self::iface::{
    Counters,
    EthernetInterface,
    Status,
};
pub use self::medium::Medium;
pub use self::observer::TransferObserver;
pub use self::router::{
    Router,
    RouterCounters,
};
pub use self::routing_table::{
    RoutingTable,
    RoutingTableRow,
};
