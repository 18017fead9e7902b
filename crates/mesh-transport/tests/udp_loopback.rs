//! Integration tests: UDP link layer on the loopback interface.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mesh_protocol::{
    LinkError, LinkLayer, LinkLayerTransport, Mesh, MeshConfig, Message, NodeId, PayloadType,
};
use mesh_transport::{UdpConfig, UdpTransport};

const WAIT: Duration = Duration::from_secs(5);

fn loopback() -> UdpConfig {
    UdpConfig::new("127.0.0.1:0".parse().unwrap())
}

/// Two transports that know each other.
async fn linked_pair() -> (UdpTransport, UdpTransport) {
    let a = UdpTransport::bind(loopback()).await.unwrap();
    let b = UdpTransport::bind(loopback().peer(a.local_addr())).await.unwrap();
    a.add_peer(b.local_addr());
    (a, b)
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test]
async fn datagram_reaches_peer_handler() {
    let (a, b) = linked_pair().await;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    b.set_inbound(Arc::new(move |message| sink.lock().unwrap().push(message)));

    let message = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        b"datagram".to_vec(),
    );
    a.send(&message).unwrap();

    assert!(wait_until(|| received.lock().unwrap().len() == 1).await);
    assert_eq!(received.lock().unwrap()[0], message);
    assert_eq!(a.link_layer(), LinkLayer::Ip);
}

#[tokio::test]
async fn garbage_datagrams_are_dropped() {
    let (a, b) = linked_pair().await;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    b.set_inbound(Arc::new(move |message| sink.lock().unwrap().push(message)));

    let raw = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    raw.send_to(&[0xff; 10], b.local_addr()).await.unwrap();
    let mut future_version = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        Vec::new(),
    )
    .to_bytes();
    future_version[0] = 2;
    raw.send_to(&future_version, b.local_addr()).await.unwrap();

    // The reader keeps going after bad input.
    let message = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        b"still here".to_vec(),
    );
    a.send(&message).unwrap();
    assert!(wait_until(|| received.lock().unwrap().len() == 1).await);
    assert_eq!(received.lock().unwrap()[0], message);
}

#[tokio::test]
async fn oversized_message_is_refused() {
    let transport = UdpTransport::bind(loopback().max_datagram_size(100))
        .await
        .unwrap();
    let message = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        vec![0; 100],
    );
    assert!(matches!(
        transport.send(&message),
        Err(LinkError::TooLarge { size: 151, max: 100 })
    ));
}

#[tokio::test]
async fn truncated_datagram_is_dropped() {
    let receiver = UdpTransport::bind(loopback().max_datagram_size(60))
        .await
        .unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    receiver.set_inbound(Arc::new(move |message| sink.lock().unwrap().push(message)));

    let raw = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let oversized = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        vec![7; 100],
    )
    .to_bytes();
    assert_eq!(oversized.len(), 151);
    raw.send_to(&oversized, receiver.local_addr()).await.unwrap();

    let small = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(2),
        PayloadType(9),
        b"fits".to_vec(),
    );
    raw.send_to(&small.to_bytes(), receiver.local_addr())
        .await
        .unwrap();

    assert!(wait_until(|| !received.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*received.lock().unwrap(), vec![small]);
}

#[tokio::test]
async fn resend_skips_the_sending_peer() {
    let hub = Arc::new(UdpTransport::bind(loopback()).await.unwrap());
    let left = UdpTransport::bind(loopback().peer(hub.local_addr()))
        .await
        .unwrap();
    let right = UdpTransport::bind(loopback().peer(hub.local_addr()))
        .await
        .unwrap();
    hub.add_peer(left.local_addr());
    hub.add_peer(right.local_addr());
    assert!(hub.is_multipoint());

    // The hub sends every packet straight back out, like a forwarding mesh.
    let weak = Arc::downgrade(&hub);
    hub.set_inbound(Arc::new(move |message| {
        if let Some(hub) = weak.upgrade() {
            hub.send(&message).unwrap();
        }
    }));

    let heard_left = Arc::new(Mutex::new(Vec::new()));
    let sink = heard_left.clone();
    left.set_inbound(Arc::new(move |message| sink.lock().unwrap().push(message)));
    let heard_right = Arc::new(Mutex::new(Vec::new()));
    let sink = heard_right.clone();
    right.set_inbound(Arc::new(move |message| sink.lock().unwrap().push(message)));

    let message = Message::new(
        NodeId::from_u128(1),
        NodeId::from_u128(3),
        PayloadType(9),
        b"across".to_vec(),
    );
    left.send(&message).unwrap();

    assert!(wait_until(|| heard_right.lock().unwrap().len() == 1).await);
    assert_eq!(heard_right.lock().unwrap()[0], message);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(heard_left.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mesh_relays_between_peers_of_one_socket() {
    let alice = Mesh::new(NodeId::from_u128(0xa), MeshConfig::default());
    let relay = Mesh::new(NodeId::from_u128(0xb), MeshConfig::default());
    let bob = Mesh::new(NodeId::from_u128(0xc), MeshConfig::default());

    // alice and bob only know the relay; the relay reaches both through
    // a single socket.
    let hub = UdpTransport::bind(loopback()).await.unwrap();
    let alice_link = UdpTransport::bind(loopback().peer(hub.local_addr()))
        .await
        .unwrap();
    let bob_link = UdpTransport::bind(loopback().peer(hub.local_addr()))
        .await
        .unwrap();
    hub.add_peer(alice_link.local_addr());
    hub.add_peer(bob_link.local_addr());

    alice.attach(Arc::new(alice_link));
    relay.attach(Arc::new(hub));
    bob.attach(Arc::new(bob_link));

    alice
        .control()
        .echo(bob.address(), WAIT)
        .await
        .expect("echo through single-socket relay");
    let hops = alice
        .control()
        .path(bob.address(), 5, WAIT)
        .await
        .expect("path through single-socket relay");
    assert_eq!(hops, 1);
}

#[tokio::test]
async fn add_peer_ignores_duplicates() {
    let transport = UdpTransport::bind(loopback()).await.unwrap();
    let peer = "127.0.0.1:7700".parse().unwrap();
    transport.add_peer(peer);
    transport.add_peer(peer);
    assert_eq!(transport.peers(), vec![peer]);
}

#[tokio::test]
async fn echo_and_path_over_udp_relay() {
    let alice = Mesh::new(NodeId::from_u128(0xa), MeshConfig::default());
    let relay = Mesh::new(NodeId::from_u128(0xb), MeshConfig::default());
    let bob = Mesh::new(NodeId::from_u128(0xc), MeshConfig::default());

    // alice <-> relay <-> bob, each hop its own socket pair.
    let (alice_link, relay_left) = linked_pair().await;
    let (relay_right, bob_link) = linked_pair().await;
    alice.attach(Arc::new(alice_link));
    relay.attach(Arc::new(relay_left));
    relay.attach(Arc::new(relay_right));
    bob.attach(Arc::new(bob_link));

    alice
        .control()
        .echo(bob.address(), WAIT)
        .await
        .expect("echo through relay");
    let hops = alice
        .control()
        .path(bob.address(), 5, WAIT)
        .await
        .expect("path");
    assert_eq!(hops, 1);
    let layers = alice
        .control()
        .link_layers(relay.address(), WAIT)
        .await
        .expect("link layers");
    assert_eq!(layers, [LinkLayer::Ip].into());
}
