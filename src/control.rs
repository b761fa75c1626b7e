//! Control transport between the channel thread and the socket thread.
//!
//! The socket thread blocks inside a poller that can only wait on
//! sockets, so the channel thread wakes it by sending a sentinel byte
//! string over a dedicated intra-process PAIR socket. The command itself
//! travels out of band through a bounded in-memory queue: shipping rich
//! typed commands as socket frames would force serialization, and a
//! `zmq::Socket` or a boxed closure cannot be a frame at all.
//!
//! Invariant: one sentinel per enqueue, in the same order. The queue is
//! FIFO, so for any single socket the socket thread performs operations
//! in exactly the order the channel thread issued them.

use flume::{Receiver, Sender};

use crate::command::SocketCmd;
use crate::error::{DriveshaftError, Result};

/// Wake-up tag: a command is waiting on the queue.
pub(crate) const SENTINEL: &[u8] = b"sentinel";

/// Wake-up tag: tear the socket thread down.
pub(crate) const SHUTDOWN: &[u8] = b"shutdown";

/// Capacity of the command queue. Its fullness is the only backpressure
/// between the channel thread and the socket thread.
pub(crate) const QUEUE_CAPACITY: usize = 8;

pub(crate) fn command_queue() -> (Sender<SocketCmd>, Receiver<SocketCmd>) {
    flume::bounded(QUEUE_CAPACITY)
}

/// The channel thread's half of the transport: the connected client PAIR
/// plus the queue's sender.
pub(crate) struct ControlTransport {
    queue: Sender<SocketCmd>,
    pair: zmq::Socket,
}

impl ControlTransport {
    pub fn new(queue: Sender<SocketCmd>, pair: zmq::Socket) -> Self {
        Self { queue, pair }
    }

    /// Queue a command for the socket thread and wake it.
    ///
    /// Blocks while the queue is full.
    pub fn wake(&self, cmd: SocketCmd) -> Result<()> {
        self.queue
            .send(cmd)
            .map_err(|_| DriveshaftError::Terminated)?;
        // The sentinel send is blocking: a silently lost wake-up would
        // strand the command in the queue forever.
        self.pair.send(SENTINEL, 0)?;
        Ok(())
    }

    /// Tell the socket thread to close every socket and exit.
    pub fn wake_shutdown(&self) -> Result<()> {
        self.pair.send(SHUTDOWN, 0)?;
        Ok(())
    }
}
