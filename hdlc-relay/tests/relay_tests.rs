//! End-to-end tests: a real relay on loopback with several stations.
//!
//! Stations announce distinct addresses (10.0.0.x) in their UA so routing
//! is deterministic even though every connection comes from 127.0.0.1.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use hdlc_relay::frame::encode_address;
use hdlc_relay::{
    Frame, Relay, RelayConfig, Station, StationConfig, StationLink, Supervisory, Unnumbered,
};

const A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
const C: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_config() -> RelayConfig {
    RelayConfig {
        accept_timeout: Duration::from_millis(20),
        ..RelayConfig::default()
    }
}

async fn bind_relay(config: RelayConfig) -> (Relay, SocketAddr) {
    let relay = Relay::bind("127.0.0.1:0".parse().unwrap(), config)
        .await
        .expect("bind relay");
    let addr = relay.local_addr().unwrap();
    (relay, addr)
}

/// Start a relay running until its active set empties.
async fn start_relay() -> (SocketAddr, JoinHandle<Relay>) {
    let (mut relay, addr) = bind_relay(fast_config()).await;
    let handle = tokio::spawn(async move {
        relay.run_until_empty().await;
        relay
    });
    (addr, handle)
}

async fn join(relay: SocketAddr, address: Ipv4Addr) -> Station {
    let config = StationConfig {
        address: Some(address),
        ..StationConfig::default()
    };
    timeout(WAIT, Station::connect(relay, config))
        .await
        .expect("connect timed out")
        .expect("connect failed")
}

async fn expect_text(station: &mut Station) -> String {
    timeout(WAIT, station.recv())
        .await
        .expect("no delivery in time")
        .expect("session ended")
}

/// Slower accept phase for tests that drive one cycle by hand.
fn single_cycle_config() -> RelayConfig {
    RelayConfig {
        accept_timeout: Duration::from_millis(500),
        ..RelayConfig::default()
    }
}

async fn next_line(stream: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    timeout(WAIT, stream.read_line(&mut line))
        .await
        .expect("relay went quiet")
        .unwrap();
    line.trim_end().to_string()
}

/// A station driven line by line: it completes the handshake as `address`,
/// answers the first poll with `answer` verbatim and returns the relay's
/// reply to that line.  The stream is returned so the session stays up.
async fn answer_first_poll(
    relay: SocketAddr,
    address: Ipv4Addr,
    mut answer: Vec<u8>,
) -> (String, BufReader<TcpStream>) {
    let mut stream = BufReader::new(TcpStream::connect(relay).await.unwrap());

    let snrm = Frame::decode(&next_line(&mut stream).await).unwrap();
    assert!(snrm.is(Unnumbered::SNRM));
    stream.write_all(b"ACK\n").await.unwrap();
    let ua = Frame::unnumbered(address, Unnumbered::UA).with_poll_final(true);
    stream.write_all(format!("{}\n", ua.encode()).as_bytes()).await.unwrap();
    assert_eq!(next_line(&mut stream).await, "ACK");

    let poll = Frame::decode(&next_line(&mut stream).await).unwrap();
    assert!(poll.is(Supervisory::RR) && poll.poll_final());
    stream.write_all(b"ACK\n").await.unwrap();

    answer.push(b'\n');
    stream.write_all(&answer).await.unwrap();
    let reply = next_line(&mut stream).await;
    (reply, stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn message_reaches_only_its_destination() {
    let (addr, relay) = start_relay().await;
    let mut a = join(addr, A).await;
    let mut b = join(addr, B).await;
    let mut c = join(addr, C).await;

    a.send_user_text_to(C, "hello").await.unwrap();
    assert_eq!(expect_text(&mut c).await, "hello");

    // Delivery happens in one pass over the active set, so anything meant
    // for B would already be waiting.
    assert_eq!(b.poll_once(), None);
    assert_eq!(a.poll_once(), None);

    a.disconnect().await;
    b.disconnect().await;
    c.disconnect().await;

    let relay = timeout(WAIT, relay).await.expect("relay kept running").unwrap();
    assert!(relay.is_empty());
}

#[tokio::test]
async fn long_text_arrives_in_payload_sized_chunks() {
    let (addr, relay) = start_relay().await;
    let a = join(addr, A).await;
    let mut b = join(addr, B).await;

    let text: String = ('a'..='z').cycle().take(100).collect();
    a.send_user_text_to(B, text.clone()).await.unwrap();

    let first = expect_text(&mut b).await;
    let second = expect_text(&mut b).await;
    assert_eq!(first.len(), 64);
    assert_eq!(second.len(), 36);
    assert_eq!(first + &second, text);

    a.disconnect().await;
    b.disconnect().await;
    timeout(WAIT, relay).await.unwrap().unwrap();
}

#[tokio::test]
async fn undeliverable_message_does_not_stop_the_relay() {
    let (addr, relay) = start_relay().await;
    let a = join(addr, A).await;
    let mut b = join(addr, B).await;

    a.send_user_text_to(Ipv4Addr::new(10, 9, 9, 9), "nobody home").await.unwrap();
    a.send_user_text_to(B, "still relaying").await.unwrap();

    assert_eq!(expect_text(&mut b).await, "still relaying");
    assert!(a.is_connected());

    a.disconnect().await;
    b.disconnect().await;
    timeout(WAIT, relay).await.unwrap().unwrap();
}

#[tokio::test]
async fn default_destination_is_used_for_plain_text() {
    let (addr, relay) = start_relay().await;
    let config = StationConfig {
        address: Some(A),
        default_destination: Some(B),
        ..StationConfig::default()
    };
    let a = timeout(WAIT, Station::connect(addr, config)).await.unwrap().unwrap();
    let mut b = join(addr, B).await;
    assert_eq!(a.default_destination(), B);
    assert_eq!(b.default_destination(), B, "falls back to the station itself");

    a.send_user_text("ping").await.unwrap();
    assert_eq!(expect_text(&mut b).await, "ping");

    a.disconnect().await;
    b.disconnect().await;
    timeout(WAIT, relay).await.unwrap().unwrap();
}

#[tokio::test]
async fn line_breaks_are_refused_before_queuing() {
    let (addr, relay) = start_relay().await;
    let a = join(addr, A).await;
    assert!(a.send_user_text_to(B, "two\nlines").await.is_err());
    a.disconnect().await;
    timeout(WAIT, relay).await.unwrap().unwrap();
}

#[tokio::test]
async fn disconnect_leaves_active_set_in_same_cycle() {
    let config = RelayConfig {
        accept_timeout: Duration::from_millis(500),
        ..RelayConfig::default()
    };
    let (mut relay, addr) = bind_relay(config).await;

    let (report, station) = tokio::join!(relay.run_cycle(), join(addr, A));
    assert_eq!(report.accepted, Some(A));
    assert_eq!(report.polled, 1);
    assert_eq!(relay.station_addresses(), vec![A]);
    assert!(!relay.is_finished());

    let (report, ()) = tokio::join!(relay.run_cycle(), station.disconnect());
    assert_eq!(report.evicted, vec![A]);
    assert!(relay.is_empty());
    assert!(relay.is_finished());
}

#[tokio::test]
async fn silent_station_is_evicted_after_poll_timeout() {
    let config = RelayConfig {
        accept_timeout: Duration::from_millis(500),
        poll_timeout: Duration::from_millis(200),
        ack_timeout: Duration::from_millis(200),
        ..RelayConfig::default()
    };
    let (mut relay, addr) = bind_relay(config).await;

    // A raw link that completes the handshake but never answers polls.
    let responder = async {
        let mut link = hdlc_relay::StationLink::connect(addr, Default::default())
            .await
            .unwrap()
            .with_address(C);
        link.handshake_as_responder().await.unwrap();
        link
    };
    let (first, _mute) = tokio::join!(relay.run_cycle(), responder);
    assert_eq!(first.accepted, Some(C));
    assert_eq!(first.evicted, vec![C], "the poll in the same cycle went unanswered");
    assert!(relay.is_finished());
}

#[tokio::test]
async fn relay_waits_until_someone_connects() {
    let (mut relay, _addr) = bind_relay(fast_config()).await;
    let report = relay.run_cycle().await;
    assert_eq!(report, Default::default());
    assert!(relay.is_empty());
    assert!(!relay.is_finished());
}

#[tokio::test]
async fn non_utf8_answer_is_acknowledged_and_station_kept() {
    let (mut relay, addr) = bind_relay(single_cycle_config()).await;

    let mut answer = format!("{}00001000hi", encode_address(A)).into_bytes();
    answer.push(0xff);
    let (report, (reply, _stream)) =
        tokio::join!(relay.run_cycle(), answer_first_poll(addr, A, answer));

    assert_eq!(reply, "ACK");
    assert_eq!(report.accepted, Some(A));
    assert!(report.evicted.is_empty());
    assert_eq!(report.routed, 0);
    assert_eq!(relay.station_addresses(), vec![A]);
}

#[tokio::test]
async fn over_long_answer_is_routed_in_chunks() {
    let (mut relay, addr) = bind_relay(single_cycle_config()).await;
    let (_, mut b) = tokio::join!(relay.run_cycle(), join(addr, B));

    let text: String = ('a'..='z').cycle().take(70).collect();
    let answer = format!("{}00001000{text}", encode_address(B)).into_bytes();
    let (report, (reply, _stream)) =
        tokio::join!(relay.run_cycle(), answer_first_poll(addr, A, answer));

    assert_eq!(reply, "ACK");
    assert_eq!(report.accepted, Some(A));
    assert_eq!(report.routed, 2);
    assert_eq!(report.delivered, 2);
    assert!(report.evicted.is_empty());

    let first = expect_text(&mut b).await;
    let second = expect_text(&mut b).await;
    assert_eq!(first.len(), 64);
    assert_eq!(second.len(), 6);
    assert_eq!(first + &second, text);
}

#[tokio::test]
async fn disc_answer_is_echoed_before_eviction() {
    let (mut relay, addr) = bind_relay(single_cycle_config()).await;

    let leaving = async {
        let mut link = StationLink::connect(addr, Default::default())
            .await
            .unwrap()
            .with_address(A);
        link.handshake_as_responder().await.unwrap();
        let poll = link.receive_frame().await.unwrap();
        assert!(poll.is(Supervisory::RR) && poll.poll_final());
        link.send_frame(Frame::unnumbered(A, Unnumbered::DISC).with_poll_final(true))
            .await
            .unwrap();
        link.receive_frame().await.unwrap()
    };
    let (report, echo) = tokio::join!(relay.run_cycle(), leaving);

    assert!(echo.is(Unnumbered::DISC));
    assert!(echo.poll_final());
    assert_eq!(echo.destination(), A);
    assert_eq!(report.evicted, vec![A]);
    assert!(relay.is_finished());
}
