//! Running a closure against a socket on the socket thread.
//!
//! Run with `cargo run --example socket_commands`.

use driveshaft::{
    flume, zmq, CommandOutput, Context, Payload, Registration, SocketFn, SocketType,
};

fn main() -> driveshaft::Result<()> {
    driveshaft::dev_tracing::init_tracing();
    let ctx = Context::named("commands-demo")?;

    let (recv_tx, _recv_rx) = flume::unbounded::<Payload>();
    let (cmd_tx, cmd_rx) = flume::bounded::<SocketFn>(8);
    let (reply_tx, reply_rx) = flume::bounded::<CommandOutput>(8);
    ctx.register(
        Registration::new()
            .socket_type(SocketType::Dealer)
            .configurator(|s| Ok(s.set_identity(b"demo-dealer")?))
            .incoming(recv_tx)
            .commands(cmd_rx)
            .replies(reply_tx),
    )?;

    cmd_tx
        .send(Box::new(|s: &zmq::Socket| {
            Ok(Some(Box::new(s.get_identity()?) as CommandOutput))
        }))
        .ok();

    if let Ok(reply) = reply_rx.recv() {
        if let Ok(identity) = reply.downcast::<Vec<u8>>() {
            println!("identity: {}", String::from_utf8_lossy(&identity));
        }
    }

    ctx.shutdown();
    ctx.join();
    Ok(())
}
