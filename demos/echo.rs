//! PUSH/PULL round-trip through the bridge.
//!
//! Run with `cargo run --example echo`.

use driveshaft::{flume, Context, Payload, Registration, SocketType};

fn main() -> driveshaft::Result<()> {
    driveshaft::dev_tracing::init_tracing();
    let ctx = Context::named("echo-demo")?;

    let (recv_tx, recv_rx) = flume::unbounded::<Payload>();
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Pull)
            .configurator(|s| Ok(s.bind("inproc://echo-demo")?))
            .incoming(recv_tx),
    )?;

    let (send_tx, send_rx) = flume::bounded::<Payload>(64);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Push)
            .configurator(|s| Ok(s.connect("inproc://echo-demo")?))
            .outgoing(send_rx),
    )?;

    for n in 0..5u32 {
        send_tx
            .send(Payload::from(format!("message {n}").into_bytes()))
            .ok();
    }
    for _ in 0..5 {
        if let Ok(payload) = recv_rx.recv() {
            println!(
                "received: {}",
                String::from_utf8_lossy(&payload.frames()[0])
            );
        }
    }

    ctx.shutdown();
    ctx.join();
    Ok(())
}
