use std::net::SocketAddr;
use std::time::Duration;

use relaychat_client::{Client, Config};
use relaychat_proto::handshake::MIN_KEY_BITS;
use relaychat_proto::{ChatMessage, ClientHandshake, Frame, FramedStream, SessionHandle, Transport};
use relaychat_relay::{Registry, Relay, RelayConfig};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Running {
    addr:     SocketAddr,
    registry: Registry,
    cancel:   CancellationToken,
    task:     JoinHandle<std::io::Result<()>>,
}

async fn start_relay(handshake_timeout: Duration) -> Running {
    let relay = Relay::bind(RelayConfig {
        bind: "127.0.0.1:0".to_string(),
        handshake_timeout,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let addr = relay.local_addr().unwrap();
    let registry = relay.registry().clone();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(relay.run_until(cancel.clone()));
    Running { addr, registry, cancel, task }
}

fn client_config(addr: SocketAddr) -> Config {
    Config { addr: addr.to_string(), key_bits: MIN_KEY_BITS, ..Config::default() }
}

/// A member that speaks the protocol by hand, for observing raw frames.
async fn raw_member(addr: SocketAddr) -> (FramedStream<TcpStream>, SessionHandle) {
    let mut stream = FramedStream::new(TcpStream::connect(addr).await.unwrap());
    let (offer, mut hs) = ClientHandshake::start(MIN_KEY_BITS).unwrap();
    stream.send(offer).await.unwrap();
    loop {
        let frame = stream.recv().await.unwrap().expect("reply");
        if let Some(session) = hs.on_frame(&frame).unwrap() {
            return (stream, session);
        }
    }
}

async fn wait_for_members(registry: &Registry, n: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while registry.len().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry did not settle");
}

#[tokio::test(flavor = "multi_thread")]
async fn broadcast_reaches_others_but_not_the_sender() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (alice, mut alice_in) = Client::connect(client_config(relay.addr)).await.unwrap();
    let (bob, mut bob_in) = Client::connect(client_config(relay.addr)).await.unwrap();

    let hello = ChatMessage::new("alice", "hi");
    alice.send(hello.clone()).await.unwrap();
    assert_eq!(bob_in.next().await, Some(hello));

    // Alice's own frame would have been queued for her before Bob's reply.
    let reply = ChatMessage::new("bob", "hey alice");
    bob.send(reply.clone()).await.unwrap();
    assert_eq!(alice_in.next().await, Some(reply));

    alice.shutdown().await.unwrap();
    bob.shutdown().await.unwrap();
    relay.cancel.cancel();
    relay.task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn members_share_the_room_key() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (_a, session_a) = raw_member(relay.addr).await;
    let (_b, session_b) = raw_member(relay.addr).await;
    assert_eq!(session_a.key(), session_b.key());
}

#[tokio::test(flavor = "multi_thread")]
async fn control_frames_after_the_handshake_are_not_forwarded() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (mut sender, session) = raw_member(relay.addr).await;
    let (mut observer, _) = raw_member(relay.addr).await;
    wait_for_members(&relay.registry, 2).await;

    sender.send(Frame::Text("{\"type\":\"ISC\",\"key\":1}".into())).await.unwrap();
    let data = session.seal(&ChatMessage::new("carol", "after")).unwrap();
    sender.send(data.clone()).await.unwrap();

    assert_eq!(observer.recv().await.unwrap(), Some(data));
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_connections_are_dropped_after_the_handshake_timeout() {
    let relay = start_relay(Duration::from_millis(200)).await;
    let mut silent = FramedStream::new(TcpStream::connect(relay.addr).await.unwrap());
    assert_eq!(silent.recv().await.unwrap(), None);
    wait_for_members(&relay.registry, 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn departures_are_unregistered() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (alice, _alice_in) = Client::connect(client_config(relay.addr)).await.unwrap();
    let (_bob, _bob_in) = Client::connect(client_config(relay.addr)).await.unwrap();
    wait_for_members(&relay.registry, 2).await;

    alice.shutdown().await.unwrap();
    wait_for_members(&relay.registry, 1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn relay_shutdown_closes_members() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (client, mut incoming) = Client::connect(client_config(relay.addr)).await.unwrap();

    relay.cancel.cancel();
    relay.task.await.unwrap().unwrap();

    assert_eq!(incoming.next().await, None);
    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_offers_are_refused_without_stalling_the_room() {
    let relay = start_relay(Duration::from_secs(30)).await;
    let (alice, _alice_in) = Client::connect(client_config(relay.addr)).await.unwrap();
    let (_bob, mut bob_in) = Client::connect(client_config(relay.addr)).await.unwrap();

    let huge = "9".repeat(7_000);
    let mut rogue = FramedStream::new(TcpStream::connect(relay.addr).await.unwrap());
    rogue
        .send(Frame::Text(format!(r#"{{"type":"ISC","key":[{huge},{huge}]}}"#)))
        .await
        .unwrap();
    let closed = tokio::time::timeout(Duration::from_secs(2), rogue.recv()).await;
    assert!(matches!(closed, Ok(Ok(None))), "relay did not refuse the offer");

    let hello = ChatMessage::new("alice", "still here");
    alice.send(hello.clone()).await.unwrap();
    let got = tokio::time::timeout(Duration::from_secs(2), bob_in.next()).await.unwrap();
    assert_eq!(got, Some(hello));
    wait_for_members(&relay.registry, 2).await;
}
