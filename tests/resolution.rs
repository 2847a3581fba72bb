#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;

mod context;

use std::time::Duration;

use netsim::net::repr::{
    Arp,
    EthernetAddress,
    EthernetFrame,
    EthernetPayload,
};
use netsim::net::{
    EthernetInterface,
    IdGenerator,
    InterfaceConfig,
    Medium,
    Status,
};
use netsim::Error;

async fn until_pending(iface: &EthernetInterface, pending: usize) {
    while iface.pending_resolutions() != pending {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn unanswered_request_times_out() {
    context::init();

    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "10.0.0.1", &medium);

    assert_matches!(
        a.eth0.resolve(context::ipv4("10.0.0.7")).await,
        Err(Error::ResolutionTimeout(addr)) if addr == context::ipv4("10.0.0.7")
    );
    assert_eq!(a.eth0.pending_resolutions(), 0);
    assert!(a.eth0.arp_entries().is_empty());
}

#[tokio::test]
async fn concurrent_resolutions_share_request() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "10.0.0.1", &medium);
    let target = context::ipv4("10.0.0.7");

    let (first, second) = tokio::join!(a.eth0.resolve(target), a.eth0.resolve(target));

    assert_matches!(first, Err(Error::ResolutionTimeout(_)));
    assert_matches!(second, Err(Error::ResolutionTimeout(_)));
    assert_eq!(a.eth0.counters().tx_packets, 1);
}

#[tokio::test]
async fn late_reply_completes_all_waiters() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "10.0.0.1", &medium);
    let target = context::ipv4("10.0.0.7");
    let target_eth_addr = EthernetAddress::new([0x02, 0, 0, 0, 0, 7]);

    let answer = async {
        until_pending(&a.eth0, 1).await;
        tokio::task::yield_now().await;

        let request = Arp::request(a.eth0.ethernet_addr(), target);
        a.eth0.receive(&EthernetFrame::new(
            target_eth_addr,
            a.eth0.ethernet_addr(),
            EthernetPayload::Arp(Arp::reply(&request, target_eth_addr)),
        ));
    };

    let (first, second, _) = tokio::join!(a.eth0.resolve(target), a.eth0.resolve(target), answer);

    assert_eq!(first.unwrap(), target_eth_addr);
    assert_eq!(second.unwrap(), target_eth_addr);
    assert_eq!(a.eth0.counters().tx_packets, 1);
    assert_eq!(a.eth0.pending_resolutions(), 0);
}

#[tokio::test]
async fn going_down_cancels_resolution() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "10.0.0.1", &medium);

    let shutdown = async {
        until_pending(&a.eth0, 1).await;
        a.eth0.set_status(Status::Down).unwrap();
    };

    let (resolved, _) = tokio::join!(a.eth0.resolve(context::ipv4("10.0.0.7")), shutdown);

    assert_matches!(resolved, Err(Error::ResolutionCancelled(_)));
    assert_eq!(a.eth0.pending_resolutions(), 0);
}

#[tokio::test]
async fn disconnecting_cancels_resolution() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let a = context::host(&ids, "a", "10.0.0.1", &medium);

    let unplug = async {
        until_pending(&a.eth0, 1).await;
        a.eth0.disconnect_medium();
    };

    let (resolved, _) = tokio::join!(a.eth0.resolve(context::ipv4("10.0.0.7")), unplug);

    assert_matches!(resolved, Err(Error::ResolutionCancelled(_)));
}

#[tokio::test]
async fn resolution_refreshes_cache_eviction_order() {
    let ids = IdGenerator::new();
    let medium = Medium::new(&ids);
    let router = netsim::net::Router::new(&ids, "a");
    let a = EthernetInterface::new(
        &ids,
        EthernetAddress::random(),
        "eth0",
        InterfaceConfig::default()
            .with_arp_cache_capacity(2)
            .with_resolve_timeout(Duration::from_millis(50)),
    );
    router.attach_interface(&a);
    a.connect_medium(&medium);
    a.set_inet_addr(Some(context::ipv4("10.0.0.1"))).unwrap();
    a.set_status(Status::Up).unwrap();

    let neighbors: Vec<_> = (2 ..= 3)
        .map(|i| context::host(&ids, "n", &format!("10.0.0.{}", i), &medium))
        .collect();

    for neighbor in &neighbors {
        a.resolve(neighbor.inet_addr()).await.unwrap();
    }
    // Using the oldest entry again makes 10.0.0.3 the eviction candidate.
    a.resolve(neighbors[0].inet_addr()).await.unwrap();

    let third = context::host(&ids, "n", "10.0.0.4", &medium);
    a.resolve(third.inet_addr()).await.unwrap();

    let cached: Vec<_> = a.arp_entries().into_iter().map(|(addr, _)| addr).collect();
    assert_eq!(cached, vec![context::ipv4("10.0.0.2"), context::ipv4("10.0.0.4")]);
}
