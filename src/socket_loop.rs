//! The socket-owning worker thread.
//!
//! Every registered `zmq::Socket` is moved onto this thread at
//! registration time and never leaves it; the rest of the system refers
//! to sockets only by id. The loop blocks in `zmq::poll` over the whole
//! table plus the control PAIR, so it wakes for wire traffic and for
//! wake-ups from the channel thread alike.
//!
//! Poll fairness: when several sockets are readable at once, one is
//! picked uniformly at random. A fixed priority would let one busy
//! socket starve the others; the random pick mirrors the nondeterminism
//! of the channel selector on the other thread.

use std::collections::HashMap;

use bytes::Bytes;
use flume::{Receiver, Sender};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::command::{ControlEvent, SocketCmd, SocketFn, SocketId};
use crate::control::{SENTINEL, SHUTDOWN};
use crate::error::Result;
use crate::payload::Payload;

pub(crate) struct SocketLoop {
    /// Server end of the control PAIR, bound before the thread starts.
    control: zmq::Socket,
    queue: Receiver<SocketCmd>,
    events: Sender<ControlEvent>,
    sockets: HashMap<SocketId, zmq::Socket>,
}

enum Readied {
    Control,
    Socket(SocketId),
}

impl SocketLoop {
    pub fn new(
        control: zmq::Socket,
        queue: Receiver<SocketCmd>,
        events: Sender<ControlEvent>,
    ) -> Self {
        Self {
            control,
            queue,
            events,
            sockets: HashMap::new(),
        }
    }

    pub fn run(mut self) {
        let mut rng = rand::thread_rng();
        loop {
            let readied = match self.poll(&mut rng) {
                Ok(Some(readied)) => readied,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "poll failed, socket loop exiting");
                    return;
                }
            };
            match readied {
                Readied::Control => match recv_all(&self.control) {
                    Ok(payload) => {
                        let tag = payload.frames().first().cloned().unwrap_or_default();
                        if tag.as_ref() == SENTINEL {
                            if !self.on_sentinel() {
                                return;
                            }
                        } else if tag.as_ref() == SHUTDOWN {
                            return self.close_all();
                        } else {
                            // Nothing else is ever sent on this socket.
                            panic!("unknown control tag on wake socket: {tag:?}");
                        }
                    }
                    Err(zmq::Error::EINTR) => {}
                    Err(e) => {
                        error!(error = %e, "control receive failed, socket loop exiting");
                        return;
                    }
                },
                Readied::Socket(id) => self.forward_incoming(&id),
            }
        }
    }

    /// Block until a socket is readable and pick one uniformly at random
    /// among the readable set. `Ok(None)` means "poll again".
    fn poll<R: Rng>(&self, rng: &mut R) -> Result<Option<Readied>> {
        // Snapshot the ids so poll index i + 1 maps back to a socket; the
        // control PAIR always sits at index 0.
        let ids: Vec<&SocketId> = self.sockets.keys().collect();
        let mut items = Vec::with_capacity(ids.len() + 1);
        items.push(self.control.as_poll_item(zmq::POLLIN));
        for id in &ids {
            items.push(self.sockets[*id].as_poll_item(zmq::POLLIN));
        }

        match zmq::poll(&mut items, -1) {
            Ok(_) => {}
            Err(zmq::Error::EINTR) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let readable: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_readable())
            .map(|(i, _)| i)
            .collect();
        Ok(readable.choose(rng).map(|&i| {
            if i == 0 {
                Readied::Control
            } else {
                Readied::Socket(ids[i - 1].clone())
            }
        }))
    }

    /// Handle one queued command. Returns `false` when the loop must
    /// exit.
    fn on_sentinel(&mut self) -> bool {
        // A sentinel is only ever sent after a successful enqueue, so
        // this recv cannot block for long.
        let cmd = match self.queue.recv() {
            Ok(cmd) => cmd,
            Err(_) => {
                error!("command queue disconnected, socket loop exiting");
                return false;
            }
        };
        match cmd {
            SocketCmd::Register(id, socket) => {
                debug!(id = %id, "socket registered");
                self.sockets.insert(id, socket);
            }
            SocketCmd::Close(id) => {
                // Dropping the handle closes the socket.
                if self.sockets.remove(&id).is_some() {
                    debug!(id = %id, "socket closed");
                } else {
                    warn!(id = %id, "close for unknown socket");
                }
            }
            SocketCmd::Command(id, run) => self.run_command(&id, run),
            SocketCmd::Outgoing(id, payload) => self.transmit(&id, &payload),
        }
        true
    }

    fn run_command(&self, id: &SocketId, run: SocketFn) {
        let socket = match self.sockets.get(id) {
            Some(socket) => socket,
            None => {
                warn!(id = %id, "command for unknown socket dropped");
                return;
            }
        };
        match run(socket) {
            Ok(Some(value)) => {
                let _ = self
                    .events
                    .send(ControlEvent::CommandResult(id.clone(), value));
            }
            Ok(None) => {}
            // The caller is not notified; silent discard is documented
            // on `SocketFn`.
            Err(e) => warn!(id = %id, error = %e, "socket command failed"),
        }
    }

    fn transmit(&self, id: &SocketId, payload: &Payload) {
        let socket = match self.sockets.get(id) {
            Some(socket) => socket,
            None => {
                warn!(id = %id, "outgoing message for unknown socket dropped");
                return;
            }
        };
        send_payload(socket, id, payload);
    }

    fn forward_incoming(&self, id: &SocketId) {
        let socket = match self.sockets.get(id) {
            Some(socket) => socket,
            None => return,
        };
        match recv_all(socket) {
            Ok(payload) => {
                // The control channel is unbounded, so this put cannot
                // park the thread.
                let _ = self.events.send(ControlEvent::Incoming(id.clone(), payload));
            }
            Err(zmq::Error::EINTR) => {}
            Err(e) => warn!(id = %id, error = %e, "receive failed"),
        }
    }

    fn close_all(mut self) {
        let count = self.sockets.len();
        self.sockets.clear();
        info!(sockets = count, "socket loop shut down");
        // The control PAIR closes when `self` drops.
    }
}

/// Receive every part of the pending message.
fn recv_all(socket: &zmq::Socket) -> zmq::Result<Payload> {
    let mut frames = Vec::new();
    loop {
        let frame = socket.recv_bytes(0)?;
        frames.push(Bytes::from(frame));
        if !socket.get_rcvmore()? {
            break;
        }
    }
    Ok(Payload::from_frames(frames))
}

/// Transmit a payload without ever blocking the loop.
///
/// Multipart payloads send every frame with `SNDMORE` except the last. A
/// frame the socket cannot accept right now aborts the rest of the
/// message: the outgoing path has no backpressure, so liveness wins over
/// delivery.
fn send_payload(socket: &zmq::Socket, id: &SocketId, payload: &Payload) {
    let frames = payload.frames();
    if frames.is_empty() {
        warn!(id = %id, "empty outgoing message dropped");
        return;
    }
    let last = frames.len() - 1;
    for (i, frame) in frames.iter().enumerate() {
        let flags = if i < last {
            zmq::DONTWAIT | zmq::SNDMORE
        } else {
            zmq::DONTWAIT
        };
        match socket.send(frame.as_ref(), flags) {
            Ok(()) => {}
            Err(zmq::Error::EAGAIN) => {
                warn!(id = %id, frame = i, "outgoing message dropped, socket not ready");
                return;
            }
            Err(e) => {
                warn!(id = %id, error = %e, "outgoing send failed");
                return;
            }
        }
    }
}
