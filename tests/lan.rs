#[macro_use]
extern crate lazy_static;

mod context;

use std::sync::Arc;

use parking_lot::Mutex;

use netsim::net::repr::{
    EthernetFrame,
    EthernetPayload,
    Ipv4Packet,
};
use netsim::net::{
    IdGenerator,
    Medium,
    Status,
    TransferObserver,
};

#[derive(Default)]
struct Log {
    events: Mutex<Vec<(&'static str, u16)>>,
}

impl TransferObserver for Log {
    fn transferred(&self, frame: &EthernetFrame) {
        self.events.lock().push(("transferred", frame.payload_type()));
    }

    fn transmitted(&self, frame: &EthernetFrame) {
        self.events.lock().push(("transmitted", frame.payload_type()));
    }

    fn received(&self, frame: &EthernetFrame) {
        self.events.lock().push(("received", frame.payload_type()));
    }
}

#[tokio::test]
async fn send_between_two_hosts() {
    context::init();

    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "192.168.1.1", &medium);
    let b = context::host(&ids, "b", "192.168.1.2", &medium);

    let packet = Ipv4Packet::new(a.inet_addr(), b.inet_addr(), b"hello".to_vec());
    a.router.route(packet.clone()).await.unwrap();

    let a_counters = a.eth0.counters();
    let b_counters = b.eth0.counters();
    assert_eq!(a_counters.tx_packets, 2);
    assert_eq!(b_counters.rx_packets, 2);
    assert_eq!(a_counters.rx_packets, 1);
    assert_eq!(b_counters.tx_packets, 1);
    assert_eq!(a_counters.tx_bytes, 42 + 14 + 20 + 5);

    assert_eq!(a.eth0.arp_lookup(b.inet_addr()), Some(b.eth0.ethernet_addr()));
    assert_eq!(b.router.try_recv(), Some(packet));
    assert_eq!(medium.frames_carried(), 3);
}

#[tokio::test]
async fn second_packet_uses_arp_cache() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "192.168.1.1", &medium);
    let b = context::host(&ids, "b", "192.168.1.2", &medium);

    for _ in 0 .. 2 {
        let packet = Ipv4Packet::new(a.inet_addr(), b.inet_addr(), vec![]);
        a.router.route(packet).await.unwrap();
    }

    assert_eq!(a.eth0.counters().tx_packets, 3);
    assert_eq!(b.eth0.counters().rx_packets, 3);
    assert_eq!(b.router.counters().delivered, 2);
}

#[tokio::test]
async fn observers_see_causal_order() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "192.168.1.1", &medium);
    let b = context::host(&ids, "b", "192.168.1.2", &medium);

    let a_log = Arc::new(Log::default());
    let medium_log = Arc::new(Log::default());
    a.eth0.add_observer(a_log.clone());
    medium.add_observer(medium_log.clone());

    let packet = Ipv4Packet::new(a.inet_addr(), b.inet_addr(), vec![]);
    a.router.route(packet).await.unwrap();

    assert_eq!(
        *a_log.events.lock(),
        vec![
            ("transferred", 0x806),
            ("transmitted", 0x806),
            ("transferred", 0x806),
            ("received", 0x806),
            ("transferred", 0x800),
            ("transmitted", 0x800),
        ]
    );
    assert_eq!(
        *medium_log.events.lock(),
        vec![
            ("transferred", 0x806),
            ("transferred", 0x806),
            ("transferred", 0x800),
        ]
    );
}

#[tokio::test]
async fn down_interface_is_silent() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "192.168.1.1", &medium);
    let b = context::host(&ids, "b", "192.168.1.2", &medium);
    b.eth0.set_status(Status::Down).unwrap();

    let packet = Ipv4Packet::new(a.inet_addr(), b.inet_addr(), vec![]);
    assert!(a.router.route(packet).await.is_err());

    assert_eq!(b.eth0.counters(), Default::default());
    assert_eq!(a.eth0.counters().tx_dropped, 1);
}

#[test]
fn unknown_ether_type_counts_error() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "192.168.1.1", &medium);
    let b = context::host(&ids, "b", "192.168.1.2", &medium);

    a.eth0.transmit(EthernetFrame::new(
        a.eth0.ethernet_addr(),
        b.eth0.ethernet_addr(),
        EthernetPayload::Unknown {
            eth_type: 0x86dd,
            data: vec![0; 40],
        },
    ));

    assert_eq!(b.eth0.counters().rx_errors, 1);
    assert_eq!(b.eth0.counters().rx_packets, 0);
}
