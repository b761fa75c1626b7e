//! The channel-owning worker thread.
//!
//! Every channel endpoint in the registration table belongs to this
//! thread. The loop blocks in a `flume::Selector` over the control event
//! channel plus every bundle's receivable endpoints, so it wakes for
//! application traffic and for events from the socket thread alike.
//!
//! Deliveries toward the application (`incoming`, `replies`) are
//! non-blocking offers: a stalled application drops messages instead of
//! wedging the router. Forwarding toward the socket thread goes through
//! the bounded command queue and may block; that is the system's
//! backpressure on producers.

use std::collections::HashMap;

use flume::{Receiver, RecvError, Selector, TrySendError};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::bundle::SocketBundle;
use crate::command::{CommandOutput, ControlEvent, SocketCmd, SocketFn, SocketId};
use crate::control::ControlTransport;
use crate::error::Result;
use crate::payload::Payload;

pub(crate) struct ChannelLoop {
    transport: ControlTransport,
    events: Receiver<ControlEvent>,
    bundles: HashMap<SocketId, SocketBundle>,
    next_id: u64,
}

/// What the selector fired on, mapped into one owned value so dispatch
/// happens after every borrow of the table has ended.
enum Fired {
    Event(std::result::Result<ControlEvent, RecvError>),
    Outgoing(SocketId, std::result::Result<Payload, RecvError>),
    Command(SocketId, std::result::Result<SocketFn, RecvError>),
}

impl ChannelLoop {
    pub fn new(transport: ControlTransport, events: Receiver<ControlEvent>) -> Self {
        Self {
            transport,
            events,
            bundles: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn run(mut self) {
        let mut rng = rand::thread_rng();
        loop {
            match self.select(&mut rng) {
                Fired::Event(Ok(event)) => match event {
                    ControlEvent::Register(socket, bundle) => {
                        let id = self.fresh_id();
                        debug!(id = %id, "pairing registered");
                        self.bundles.insert(id.clone(), bundle);
                        if self.wake(SocketCmd::Register(id, socket)).is_err() {
                            return;
                        }
                    }
                    ControlEvent::CommandResult(id, value) => self.deliver_reply(&id, value),
                    ControlEvent::Incoming(id, payload) => self.deliver_incoming(&id, payload),
                    ControlEvent::Shutdown => return self.teardown(),
                },
                // Every sender of the control channel is gone: same as an
                // explicit shutdown.
                Fired::Event(Err(RecvError::Disconnected)) => return self.teardown(),
                Fired::Outgoing(id, Ok(payload)) => {
                    if self.wake(SocketCmd::Outgoing(id, payload)).is_err() {
                        return;
                    }
                }
                Fired::Command(id, Ok(run)) => {
                    if self.wake(SocketCmd::Command(id, run)).is_err() {
                        return;
                    }
                }
                // The application dropped its half of a bundle channel.
                Fired::Outgoing(id, Err(RecvError::Disconnected))
                | Fired::Command(id, Err(RecvError::Disconnected)) => {
                    if self.close_pairing(&id).is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Block until an endpoint is receivable.
    fn select<R: Rng>(&self, rng: &mut R) -> Fired {
        // The selector resolves simultaneous readiness by handler order,
        // so the bundles are shuffled each iteration to keep any one
        // pairing from being favored.
        let mut entries: Vec<(&SocketId, &SocketBundle)> = self.bundles.iter().collect();
        entries.shuffle(rng);

        let mut selector = Selector::new().recv(&self.events, Fired::Event);
        for (id, bundle) in entries {
            if let Some(outgoing) = &bundle.outgoing {
                let id = id.clone();
                selector = selector.recv(outgoing, move |r| Fired::Outgoing(id.clone(), r));
            }
            if let Some(commands) = &bundle.commands {
                let id = id.clone();
                selector = selector.recv(commands, move |r| Fired::Command(id.clone(), r));
            }
        }
        selector.wait()
    }

    fn fresh_id(&mut self) -> SocketId {
        self.next_id += 1;
        format!("zmq-{}", self.next_id)
    }

    /// Forward a command to the socket thread. An error means the socket
    /// thread is gone and the loop must exit.
    fn wake(&self, cmd: SocketCmd) -> Result<()> {
        let result = self.transport.wake(cmd);
        if let Err(e) = &result {
            error!(error = %e, "failed to wake socket thread, channel loop exiting");
        }
        result
    }

    fn deliver_reply(&self, id: &SocketId, value: CommandOutput) {
        let bundle = match self.bundles.get(id) {
            Some(bundle) => bundle,
            None => {
                warn!(id = %id, "command result for unregistered socket dropped");
                return;
            }
        };
        let replies = match &bundle.replies {
            Some(replies) => replies,
            None => return,
        };
        match replies.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(id = %id, "command result dropped, replies channel full");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(id = %id, "command result dropped, replies channel closed");
            }
        }
    }

    fn deliver_incoming(&self, id: &SocketId, payload: Payload) {
        let bundle = match self.bundles.get(id) {
            Some(bundle) => bundle,
            None => {
                // A close can race one last inbound message out of the
                // socket thread.
                warn!(id = %id, "inbound message for unregistered socket dropped");
                return;
            }
        };
        let incoming = match &bundle.incoming {
            Some(incoming) => incoming,
            // Fail fast: a socket that receives must have been
            // registered with an incoming channel.
            None => panic!("inbound message for {id} but the pairing has no incoming channel"),
        };
        match incoming.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(id = %id, "inbound message dropped, incoming channel full");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(id = %id, "inbound message dropped, incoming channel closed");
            }
        }
    }

    /// Close one pairing: the socket thread drops the socket, and
    /// dropping the bundle disconnects every application-held endpoint.
    fn close_pairing(&mut self, id: &SocketId) -> Result<()> {
        if let Some(bundle) = self.bundles.remove(id) {
            debug!(id = %id, "pairing closed");
            self.wake(SocketCmd::Close(id.clone()))?;
            drop(bundle);
        }
        Ok(())
    }

    /// Full teardown: close every pairing, then tell the socket thread to
    /// exit.
    fn teardown(mut self) {
        info!(pairings = self.bundles.len(), "channel loop shutting down");
        for (id, bundle) in self.bundles.drain() {
            if self.transport.wake(SocketCmd::Close(id)).is_err() {
                return;
            }
            drop(bundle);
        }
        let _ = self.transport.wake_shutdown();
    }
}
