//! The bounded command queue is the system's backpressure on producers;
//! deliveries toward the application drop instead of blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use driveshaft::{flume, zmq, Context, Payload, Registration, SocketFn, SocketType};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_full_queue_blocks_the_producer() {
    driveshaft::dev_tracing::init_tracing();
    let ctx = Context::named("backpressure").unwrap();

    // A PUSH with a command channel we can wedge the socket thread with.
    let (send_tx, send_rx) = flume::bounded::<Payload>(1);
    let (cmd_tx, cmd_rx) = flume::bounded::<SocketFn>(1);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Push)
            .configurator(|s| Ok(s.connect("inproc://backpressure-sink")?))
            .outgoing(send_rx)
            .commands(cmd_rx),
    )
    .unwrap();

    // Park the socket thread inside a command so nothing drains the
    // queue.
    let wedged = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let (w, r) = (wedged.clone(), release.clone());
    cmd_tx
        .send(Box::new(move |_: &zmq::Socket| {
            w.store(true, Ordering::SeqCst);
            while !r.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(None)
        }))
        .unwrap();
    while !wedged.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }

    // Twelve messages cannot fit in queue(8) + channel(1) + the one in
    // the channel loop's hand, so the producer must block.
    let finished = Arc::new(AtomicBool::new(false));
    let done = finished.clone();
    let producer = thread::spawn(move || {
        for n in 0..12u32 {
            send_tx
                .send(Payload::from(format!("m{n}").into_bytes()))
                .unwrap();
        }
        done.store(true, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(300));
    assert!(
        !finished.load(Ordering::SeqCst),
        "producer should be blocked by queue backpressure"
    );

    // Release the socket thread: everything drains and the producer
    // finishes.
    release.store(true, Ordering::SeqCst);
    producer.join().unwrap();
    assert!(finished.load(Ordering::SeqCst));

    // The bridge is still live: an independent pairing round-trips.
    let (recv_tx, recv_rx) = flume::unbounded::<Payload>();
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pull)
            .configurator(|s| Ok(s.bind("inproc://backpressure-echo")?))
            .incoming(recv_tx),
    )
    .unwrap();
    let (echo_tx, echo_rx) = flume::bounded::<Payload>(8);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Push)
            .configurator(|s| Ok(s.connect("inproc://backpressure-echo")?))
            .outgoing(echo_rx),
    )
    .unwrap();
    echo_tx.send(Payload::from("alive")).unwrap();
    assert_eq!(
        recv_rx.recv_timeout(TIMEOUT).unwrap(),
        Payload::from("alive")
    );

    ctx.shutdown();
    ctx.join();
}

#[test]
fn test_full_incoming_channel_drops_instead_of_blocking() {
    let ctx = Context::named("drop-on-full").unwrap();

    // A tiny incoming channel that nobody drains.
    let (recv_tx, recv_rx) = flume::bounded::<Payload>(1);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pull)
            .configurator(|s| Ok(s.bind("inproc://drop-flood")?))
            .incoming(recv_tx),
    )
    .unwrap();

    // Flood it from a raw socket on the same messaging context.
    let feeder = ctx.zmq_context().socket(zmq::PUSH).unwrap();
    feeder.connect("inproc://drop-flood").unwrap();
    for n in 0..10u32 {
        feeder.send(format!("flood-{n}").as_bytes(), 0).unwrap();
    }

    // Let the bridge pull everything off the wire; overflow must be
    // dropped, not queued and not blocking the loop.
    thread::sleep(Duration::from_millis(500));

    assert_eq!(recv_rx.try_recv().unwrap(), Payload::from("flood-0"));
    assert!(recv_rx.try_recv().is_err());

    // The router kept processing: a second pairing still round-trips.
    let (ok_tx, ok_rx) = flume::unbounded::<Payload>();
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pull)
            .configurator(|s| Ok(s.bind("inproc://drop-echo")?))
            .incoming(ok_tx),
    )
    .unwrap();
    let (echo_tx, echo_rx) = flume::bounded::<Payload>(8);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Push)
            .configurator(|s| Ok(s.connect("inproc://drop-echo")?))
            .outgoing(echo_rx),
    )
    .unwrap();
    echo_tx.send(Payload::from("still-routing")).unwrap();
    assert_eq!(
        ok_rx.recv_timeout(TIMEOUT).unwrap(),
        Payload::from("still-routing")
    );

    ctx.shutdown();
    ctx.join();
}
