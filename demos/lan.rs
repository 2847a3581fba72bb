//! Builds two LANs joined by a gateway, sends packets across and prints what
//! every device saw.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example lan -- --count 3 --ttl 64

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use netsim::net::repr::{
    EthernetAddress,
    Ipv4Address,
    Ipv4Packet,
};
use netsim::net::{
    EthernetInterface,
    IdGenerator,
    InterfaceConfig,
    Medium,
    Router,
    RoutingTableRow,
    Status,
};

#[derive(Parser, Debug)]
#[command(name = "lan")]
#[command(about = "Sends IPv4 packets between two simulated LANs")]
struct Args {
    /// Number of packets to send
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Payload carried by every packet
    #[arg(short, long, default_value = "hello")]
    payload: String,

    /// TTL of the packets, 1 expires them at the gateway
    #[arg(long, default_value_t = 64)]
    ttl: u8,

    /// Milliseconds to wait for ARP replies
    #[arg(long, default_value_t = 100)]
    resolve_timeout: u64,
}

fn iface(
    ids: &IdGenerator,
    config: &InterfaceConfig,
    router: &Arc<Router>,
    medium: &Arc<Medium>,
    name: &str,
    addr: Ipv4Address,
) -> netsim::Result<Arc<EthernetInterface>> {
    let iface = EthernetInterface::new(ids, EthernetAddress::random(), name, config.clone());
    router.attach_interface(&iface);
    iface.connect_medium(medium);
    iface.set_inet_addr(Some(addr))?;
    iface.set_status(Status::Up)?;
    Ok(iface)
}

fn print_router(router: &Router) {
    println!("== {} {:?}", router.name(), router.counters());
    print!("{}", router.routing_table());

    for iface in router.interfaces() {
        println!(
            "{}: {} inet {} netmask {} broadcast {}",
            iface.name(),
            iface.encap(),
            iface.inet_addr().map_or("-".to_string(), |addr| addr.to_string()),
            iface.netmask().map_or("-".to_string(), |addr| addr.to_string()),
            iface.broadcast_addr().map_or("-".to_string(), |addr| addr.to_string()),
        );
        println!("    {:?}", iface.counters());
        for (ipv4_addr, eth_addr) in iface.arp_entries() {
            println!("    arp {} at {}", ipv4_addr, eth_addr);
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> netsim::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let ids = IdGenerator::new();
    let resolve_timeout = Duration::from_millis(args.resolve_timeout);
    let config = InterfaceConfig::default().with_resolve_timeout(resolve_timeout);

    let lan1 = Medium::new(&ids);
    let lan2 = Medium::new(&ids);

    let gateway = Router::new(&ids, "gateway");
    iface(&ids, &config, &gateway, &lan1, "eth0", "192.168.1.1".parse()?)?;
    iface(&ids, &config, &gateway, &lan2, "eth1", "10.0.0.1".parse()?)?;

    let a = Router::new(&ids, "a");
    let a_eth0 = iface(&ids, &config, &a, &lan1, "eth0", "192.168.1.2".parse()?)?;
    a.add_route(RoutingTableRow::new(
        Ipv4Address::UNSPECIFIED,
        Ipv4Address::UNSPECIFIED,
        Some("192.168.1.1".parse()?),
        10,
        a_eth0.clone(),
    )?);

    let b = Router::new(&ids, "b");
    let b_eth0 = iface(&ids, &config, &b, &lan2, "eth0", "10.0.0.2".parse()?)?;
    b.add_route(RoutingTableRow::new(
        Ipv4Address::UNSPECIFIED,
        Ipv4Address::UNSPECIFIED,
        Some("10.0.0.1".parse()?),
        10,
        b_eth0.clone(),
    )?);

    for seq in 0 .. args.count {
        let packet = Ipv4Packet::new(
            a_eth0.inet_addr().unwrap_or(Ipv4Address::UNSPECIFIED),
            b_eth0.inet_addr().unwrap_or(Ipv4Address::UNSPECIFIED),
            args.payload.as_bytes().to_vec(),
        )
        .with_ttl(args.ttl);

        if let Err(err) = a.route(packet).await {
            println!("packet {} not sent: {}", seq, err);
            continue;
        }

        match tokio::time::timeout(Duration::from_secs(1), b.recv()).await {
            Ok(packet) => println!(
                "packet {} from {} arrived with ttl {}: {:?}",
                seq,
                packet.src_addr(),
                packet.ttl(),
                String::from_utf8_lossy(packet.payload())
            ),
            Err(_) => println!("packet {} lost", seq),
        }
    }
    println!();

    for router in [&a, &gateway, &b] {
        print_router(router);
    }

    println!(
        "lan1 carried {} frames, lan2 carried {} frames",
        lan1.frames_carried(),
        lan2.frames_carried()
    );

    Ok(())
}
