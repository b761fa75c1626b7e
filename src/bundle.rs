//! Per-socket channel bundle.

use flume::{Receiver, Sender};

use crate::command::{CommandOutput, SocketFn};
use crate::payload::Payload;

/// The channel halves the channel thread owns for one registered socket.
///
/// The application keeps the opposite half of each channel. At least one
/// of `outgoing` and `incoming` is present (enforced at registration).
/// Dropping the bundle disconnects every application-held endpoint, which
/// is how a pairing's channels are closed.
pub(crate) struct SocketBundle {
    /// Application → wire: payloads to transmit.
    pub outgoing: Option<Receiver<Payload>>,
    /// Wire → application: delivered payloads. Offers never block.
    pub incoming: Option<Sender<Payload>>,
    /// Application → socket thread: closures to run on the socket.
    pub commands: Option<Receiver<SocketFn>>,
    /// Socket thread → application: command results. Offers never block.
    pub replies: Option<Sender<CommandOutput>>,
}
