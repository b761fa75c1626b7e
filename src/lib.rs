//! # driveshaft
//!
//! Bridge thread-confined ZeroMQ sockets onto [`flume`] channels.
//!
//! ZeroMQ sockets must be touched from exactly one thread. `driveshaft`
//! dedicates one OS thread to every socket and another to every channel
//! endpoint, so application code drives sockets entirely through channel
//! reads and writes:
//!
//! - **Socket loop**: owns all registered sockets, blocks in
//!   `zmq::poll`, performs every socket operation.
//! - **Channel loop**: owns the registration table, blocks in a channel
//!   selector, performs every channel operation.
//! - **Control transport**: a dedicated `inproc` PAIR socket carries
//!   wake-up sentinels while a bounded queue carries the command
//!   payloads, so each thread stays blocked on its native primitive yet
//!   remains promptly interruptible by the other.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use driveshaft::{Context, Payload, Registration, SocketType};
//!
//! # fn main() -> driveshaft::Result<()> {
//! let ctx = Context::new()?;
//!
//! let (send_tx, send_rx) = flume::bounded::<Payload>(64);
//! let (recv_tx, recv_rx) = flume::unbounded::<Payload>();
//!
//! ctx.register(
//!     Registration::new()
//!         .socket_type(SocketType::Pair)
//!         .configurator(|s| Ok(s.bind("tcp://127.0.0.1:5555")?))
//!         .outgoing(send_rx)
//!         .incoming(recv_tx),
//! )?;
//!
//! send_tx.send(Payload::from("hello")).ok();
//! if let Ok(reply) = recv_rx.recv() {
//!     println!("got {} frame(s)", reply.frames().len());
//! }
//!
//! ctx.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Delivery policy
//!
//! Outbound sends that would block are dropped and logged; the bounded
//! command queue is the only backpressure between the application and
//! the wire. Inbound deliveries never block the bridge: keep the
//! `incoming` channel drained or messages are dropped.

#![cfg_attr(not(test), deny(unsafe_code))]

mod bundle;
mod channel_loop;
mod control;
mod socket_loop;

pub mod command;
pub mod context;
pub mod dev_tracing;
pub mod error;
pub mod payload;
pub mod registration;
pub mod socket_type;

pub use command::{CommandOutput, SocketFn, SocketId};
pub use context::{global_context, register, Context};
pub use error::{DriveshaftError, Result};
pub use payload::Payload;
pub use registration::{Configurator, Registration};
pub use socket_type::SocketType;

// The public API traffics in these crates' types.
pub use bytes::Bytes;
pub use flume;
pub use zmq;

/// Ergonomic imports for downstream crates.
pub mod prelude {
    pub use crate::command::{CommandOutput, SocketFn, SocketId};
    pub use crate::context::{global_context, register, Context};
    pub use crate::error::{DriveshaftError, Result};
    pub use crate::payload::Payload;
    pub use crate::registration::{Configurator, Registration};
    pub use crate::socket_type::SocketType;
}
