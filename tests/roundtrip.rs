//! End-to-end round-trips through PUSH/PULL loopbacks inside one
//! context.

use std::time::{Duration, Instant};

use driveshaft::{flume, zmq, Bytes, Context, Payload, Registration, SocketType};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Register a bound PULL and a connected PUSH on `addr`; returns the
/// application ends: a sender feeding the PUSH and a receiver draining
/// the PULL.
///
/// PULL registers first: sockets are configured at registration time on
/// the calling thread, so its bind is in place before PUSH connects.
fn push_pull(
    ctx: &Context,
    addr: &'static str,
) -> (flume::Sender<Payload>, flume::Receiver<Payload>) {
    let (recv_tx, recv_rx) = flume::unbounded();
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pull)
            .configurator(move |s| Ok(s.bind(addr)?))
            .incoming(recv_tx),
    )
    .unwrap();

    let (send_tx, send_rx) = flume::bounded(64);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Push)
            .configurator(move |s| Ok(s.connect(addr)?))
            .outgoing(send_rx),
    )
    .unwrap();

    (send_tx, recv_rx)
}

/// Bind `addr` on a fresh probe socket, retrying while the previous
/// owner's close is still in flight (libzmq reaps sockets
/// asynchronously).
fn assert_addr_becomes_bindable(ctx: &Context, addr: &str) {
    let probe = ctx.zmq_context().socket(zmq::PULL).unwrap();
    let deadline = Instant::now() + TIMEOUT;
    loop {
        match probe.bind(addr) {
            Ok(()) => return,
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("socket owning {addr} was never closed: {e}"),
        }
    }
}

#[test]
fn test_echo_round_trip() {
    driveshaft::dev_tracing::init_tracing();
    let ctx = Context::named("echo").unwrap();
    let (send_tx, recv_rx) = push_pull(&ctx, "inproc://echo-loop");

    send_tx.send(Payload::from("hello")).unwrap();

    let delivered = recv_rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(delivered, Payload::Single(Bytes::from_static(b"hello")));

    ctx.shutdown();
    ctx.join();
}

#[test]
fn test_multipart_framing_preserved() {
    let ctx = Context::named("framing").unwrap();
    let (send_tx, recv_rx) = push_pull(&ctx, "inproc://framing-loop");

    send_tx
        .send(Payload::multipart(["a", "b", "c"]))
        .unwrap();

    // Three parts arrive as exactly three parts, not flattened and not
    // single-part.
    let delivered = recv_rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(
        delivered,
        Payload::Multipart(vec![
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c"),
        ])
    );

    ctx.shutdown();
    ctx.join();
}

#[test]
fn test_per_socket_ordering() {
    let ctx = Context::named("ordering").unwrap();
    let (send_tx, recv_rx) = push_pull(&ctx, "inproc://ordering-loop");

    for n in 0..100u32 {
        send_tx
            .send(Payload::from(n.to_string().into_bytes()))
            .unwrap();
    }
    for n in 0..100u32 {
        let delivered = recv_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(delivered, Payload::from(n.to_string().into_bytes()));
    }

    ctx.shutdown();
    ctx.join();
}

#[test]
fn test_shutdown_closes_sockets_channels_and_workers() {
    let ctx = Context::named("teardown").unwrap();
    let (a_tx, a_rx) = push_pull(&ctx, "inproc://teardown-a");
    let (b_tx, b_rx) = push_pull(&ctx, "inproc://teardown-b");
    let (c_tx, c_rx) = push_pull(&ctx, "inproc://teardown-c");

    // Prove the bundles are live first.
    a_tx.send(Payload::from("ping")).unwrap();
    a_rx.recv_timeout(TIMEOUT).unwrap();

    ctx.shutdown();
    ctx.join();

    // Every bundle channel is disconnected...
    assert!(matches!(a_rx.recv(), Err(flume::RecvError::Disconnected)));
    assert!(matches!(b_rx.recv(), Err(flume::RecvError::Disconnected)));
    assert!(matches!(c_rx.recv(), Err(flume::RecvError::Disconnected)));

    // ...and no further sends succeed.
    assert!(a_tx.send(Payload::from("late")).is_err());
    assert!(b_tx.send(Payload::from("late")).is_err());
    assert!(c_tx.send(Payload::from("late")).is_err());

    // Every native socket is closed: their addresses bind again.
    for addr in [
        "inproc://teardown-a",
        "inproc://teardown-b",
        "inproc://teardown-c",
    ] {
        assert_addr_becomes_bindable(&ctx, addr);
    }
}

#[test]
fn test_dropping_one_endpoint_closes_the_pairing() {
    let ctx = Context::named("pairing-close").unwrap();

    let (send_tx, send_rx) = flume::bounded::<Payload>(8);
    let (recv_tx, recv_rx) = flume::unbounded::<Payload>();
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pair)
            .configurator(|s| Ok(s.bind("inproc://pairing-close")?))
            .outgoing(send_rx)
            .incoming(recv_tx),
    )
    .unwrap();

    // The application walks away from its send side; the whole pairing
    // must go with it.
    drop(send_tx);

    match recv_rx.recv_timeout(TIMEOUT) {
        Err(flume::RecvTimeoutError::Disconnected) => {}
        other => panic!("expected the incoming channel to close, got {other:?}"),
    }

    // The native socket is closed too: its address becomes bindable
    // again.
    assert_addr_becomes_bindable(&ctx, "inproc://pairing-close");

    ctx.shutdown();
    ctx.join();
}
