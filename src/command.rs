//! Cross-thread command and event schema.
//!
//! Two closed unions tie the worker threads together:
//!
//! - [`SocketCmd`] rides the bounded queue from the channel thread to the
//!   socket thread and names the four socket operations.
//! - [`ControlEvent`] rides the unbounded control channel into the channel
//!   thread: registration requests from the public API, command results
//!   and inbound messages from the socket thread, and shutdown.
//!
//! Exhaustive matches over these enums replace the tuple dispatch of a
//! dynamically typed design; an unknown case cannot be constructed.

use std::any::Any;
use std::fmt;

use crate::bundle::SocketBundle;
use crate::error::Result;
use crate::payload::Payload;

/// Opaque identifier tying a live socket (owned by the socket thread) to
/// its channel bundle (owned by the channel thread). Unique within one
/// context.
pub type SocketId = String;

/// Opaque result blob returned by a socket command.
pub type CommandOutput = Box<dyn Any + Send>;

/// A closure executed on the socket thread with the registered socket.
///
/// Returning `Ok(Some(value))` delivers `value` on the bundle's `replies`
/// channel; `Ok(None)` delivers nothing. An `Err` is logged on the socket
/// thread and the caller is not notified.
pub type SocketFn = Box<dyn FnOnce(&zmq::Socket) -> Result<Option<CommandOutput>> + Send>;

/// Commands queued for the socket thread.
pub(crate) enum SocketCmd {
    /// Take ownership of a freshly registered socket.
    Register(SocketId, zmq::Socket),
    /// Close and forget a socket.
    Close(SocketId),
    /// Run a closure against a socket.
    Command(SocketId, SocketFn),
    /// Transmit a payload on a socket.
    Outgoing(SocketId, Payload),
}

impl fmt::Debug for SocketCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(id, _) => f.debug_tuple("Register").field(id).finish(),
            Self::Close(id) => f.debug_tuple("Close").field(id).finish(),
            Self::Command(id, _) => f.debug_tuple("Command").field(id).finish(),
            Self::Outgoing(id, payload) => {
                f.debug_tuple("Outgoing").field(id).field(payload).finish()
            }
        }
    }
}

/// Events arriving at the channel thread.
pub(crate) enum ControlEvent {
    /// Request from the public API to bring a socket under the bridge.
    Register(zmq::Socket, SocketBundle),
    /// Non-null result of a [`SocketCmd::Command`].
    CommandResult(SocketId, CommandOutput),
    /// A message received off the wire.
    Incoming(SocketId, Payload),
    /// Tear the whole context down.
    Shutdown,
}

impl fmt::Debug for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(..) => f.write_str("Register"),
            Self::CommandResult(id, _) => f.debug_tuple("CommandResult").field(id).finish(),
            Self::Incoming(id, payload) => {
                f.debug_tuple("Incoming").field(id).field(payload).finish()
            }
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}
