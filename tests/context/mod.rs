#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use netsim::net::repr::{
    EthernetAddress,
    Ipv4Address,
};
use netsim::net::{
    EthernetInterface,
    IdGenerator,
    InterfaceConfig,
    Medium,
    Router,
    Status,
};

lazy_static! {
    pub static ref ONE_SEC: Duration = Duration::from_secs(1);
}

/// A router with a single configured interface.
pub struct Host {
    pub router: Arc<Router>,
    pub eth0: Arc<EthernetInterface>,
}

impl Host {
    pub fn inet_addr(&self) -> Ipv4Address {
        self.eth0.inet_addr().unwrap()
    }
}

/// Enables log output for a test, respecting RUST_LOG.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ipv4(addr: &str) -> Ipv4Address {
    addr.parse().unwrap()
}

pub fn config() -> InterfaceConfig {
    InterfaceConfig::default().with_resolve_timeout(Duration::from_millis(50))
}

/// Creates an interface which is up with addr and attached to router.
pub fn iface(
    ids: &IdGenerator,
    router: &Arc<Router>,
    name: &str,
    addr: &str,
    medium: &Arc<Medium>,
) -> Arc<EthernetInterface> {
    iface_with_config(ids, router, name, addr, medium, config())
}

pub fn iface_with_config(
    ids: &IdGenerator,
    router: &Arc<Router>,
    name: &str,
    addr: &str,
    medium: &Arc<Medium>,
    config: InterfaceConfig,
) -> Arc<EthernetInterface> {
    let iface = EthernetInterface::new(ids, EthernetAddress::random(), name, config);
    router.attach_interface(&iface);
    iface.connect_medium(medium);
    iface.set_inet_addr(Some(ipv4(addr))).unwrap();
    iface.set_status(Status::Up).unwrap();
    iface
}

/// Creates a host with one interface on medium.
pub fn host(ids: &IdGenerator, name: &str, addr: &str, medium: &Arc<Medium>) -> Host {
    host_with_config(ids, name, addr, medium, config())
}

pub fn host_with_config(
    ids: &IdGenerator,
    name: &str,
    addr: &str,
    medium: &Arc<Medium>,
    config: InterfaceConfig,
) -> Host {
    let router = Router::new(ids, name);
    let eth0 = iface_with_config(ids, &router, "eth0", addr, medium, config);
    Host { router, eth0 }
}

/// Awaits a future, failing the test if it takes longer than a second.
pub async fn within_one_sec<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(*ONE_SEC, future)
        .await
        .expect("timed out")
}
