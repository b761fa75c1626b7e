//! Context lifecycle: factory, worker startup, shutdown, global instance.
//!
//! A [`Context`] owns one bridge: a native messaging context, the control
//! transport, and the two worker threads. The factory assembles
//! everything without starting anything; [`Context::initialize`] binds
//! the control PAIR, connects its peer and spawns the workers, and is
//! idempotent. [`Context::register`] initializes on first use, so the
//! common path is create-and-register.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::channel_loop::ChannelLoop;
use crate::command::{ControlEvent, SocketCmd};
use crate::control::{self, ControlTransport};
use crate::error::{DriveshaftError, Result};
use crate::registration::Registration;
use crate::socket_loop::SocketLoop;

/// Process-wide counter for unique control addresses.
static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Pieces assembled by the factory and consumed when the workers start.
struct Seed {
    addr: String,
    server: zmq::Socket,
    client: zmq::Socket,
    queue_tx: Sender<SocketCmd>,
    queue_rx: Receiver<SocketCmd>,
    events_rx: Receiver<ControlEvent>,
}

/// One bridge: a messaging context, the control transport and two worker
/// threads.
///
/// Dropping the context requests shutdown; [`Context::join`] waits for
/// the workers to finish. There is no restart: once shut down, a new
/// context must be created.
pub struct Context {
    name: String,
    zmq: zmq::Context,
    events_tx: Sender<ControlEvent>,
    seed: Mutex<Option<Seed>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Context {
    /// Build a context with the default name.
    ///
    /// # Errors
    ///
    /// Fails if the control PAIR sockets cannot be created.
    pub fn new() -> Result<Self> {
        Self::named("driveshaft")
    }

    /// Build a context; the name shows up in thread names and logs.
    ///
    /// # Errors
    ///
    /// Fails if the control PAIR sockets cannot be created.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let zmq = zmq::Context::new();
        let addr = format!(
            "inproc://{}-control-{}",
            name,
            CONTEXT_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let server = zmq.socket(zmq::PAIR)?;
        let client = zmq.socket(zmq::PAIR)?;
        let (queue_tx, queue_rx) = control::command_queue();
        let (events_tx, events_rx) = flume::unbounded();
        Ok(Self {
            name,
            zmq,
            events_tx,
            seed: Mutex::new(Some(Seed {
                addr,
                server,
                client,
                queue_tx,
                queue_rx,
                events_rx,
            })),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Start both worker threads. Idempotent; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Fails if the control PAIR cannot bind/connect or a thread cannot
    /// be spawned.
    pub fn initialize(&self) -> Result<()> {
        let mut slot = self.seed.lock().expect("context state poisoned");
        let seed = match slot.take() {
            Some(seed) => seed,
            None => return Ok(()),
        };
        let Seed {
            addr,
            server,
            client,
            queue_tx,
            queue_rx,
            events_rx,
        } = seed;

        // Bind before connect: the transport is intra-process.
        server.bind(&addr)?;
        let socket_loop = SocketLoop::new(server, queue_rx, self.events_tx.clone());
        let socket_worker = thread::Builder::new()
            .name(format!("{}-zmq", self.name))
            .spawn(move || socket_loop.run())?;

        client.connect(&addr)?;
        let channel_loop = ChannelLoop::new(ControlTransport::new(queue_tx, client), events_rx);
        let channel_worker = thread::Builder::new()
            .name(format!("{}-chan", self.name))
            .spawn(move || channel_loop.run())?;

        let mut workers = self.workers.lock().expect("context state poisoned");
        workers.push(socket_worker);
        workers.push(channel_worker);
        debug!(name = %self.name, "bridge workers started");
        Ok(())
    }

    /// Register a socket with the bridge.
    ///
    /// Validates the registration, builds and configures the socket on
    /// the calling thread, then hands everything over: the channel
    /// thread assigns the socket its id and the socket thread takes
    /// ownership of the handle. This is the only way to introduce a
    /// socket.
    ///
    /// # Errors
    ///
    /// [`DriveshaftError::Usage`] for invalid argument combinations,
    /// socket-construction errors from the configurator, and
    /// [`DriveshaftError::Terminated`] after shutdown.
    pub fn register(&self, registration: Registration) -> Result<()> {
        let (source, bundle) = registration.into_parts()?;
        self.initialize()?;
        let socket = source.into_socket(&self.zmq)?;
        self.events_tx
            .send(ControlEvent::Register(socket, bundle))
            .map_err(|_| DriveshaftError::Terminated)
    }

    /// Tear the bridge down: every socket is closed, every bundle
    /// channel disconnected, both workers exit.
    ///
    /// Equivalent to closing the control event channel; repeated calls
    /// are harmless.
    pub fn shutdown(&self) {
        let _ = self.events_tx.send(ControlEvent::Shutdown);
    }

    /// Wait for both worker threads to exit.
    pub fn join(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().expect("context state poisoned");
            guard.drain(..).collect()
        };
        for worker in workers {
            let _ = worker.join();
        }
    }

    /// Whether the workers have been started.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.seed.lock().expect("context state poisoned").is_none()
    }

    /// The underlying messaging context, for building pre-built sockets
    /// that share this bridge's `inproc` namespace.
    #[must_use]
    pub fn zmq_context(&self) -> &zmq::Context {
        &self.zmq
    }

    /// The context's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.shutdown();
    }
}

static GLOBAL: Lazy<Context> = Lazy::new(|| {
    Context::named("driveshaft-global").expect("failed to build the global bridge context")
});

/// The lazily-initialized process-wide context used by [`register`] when
/// no explicit context is at hand. Lives until process exit.
pub fn global_context() -> &'static Context {
    &GLOBAL
}

/// Register a socket against the global context.
///
/// # Errors
///
/// Same as [`Context::register`].
pub fn register(registration: Registration) -> Result<()> {
    global_context().register(registration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let ctx = Context::named("idempotent").unwrap();
        assert_eq!(ctx.name(), "idempotent");
        assert!(!ctx.is_initialized());
        ctx.initialize().unwrap();
        assert!(ctx.is_initialized());
        ctx.initialize().unwrap();
        ctx.shutdown();
        ctx.join();
    }

    #[test]
    fn test_shutdown_terminates_both_workers() {
        let ctx = Context::named("terminates").unwrap();
        ctx.initialize().unwrap();
        ctx.shutdown();
        // join returns only once both loops have exited.
        ctx.join();
    }

    #[test]
    fn test_register_after_shutdown_fails() {
        let ctx = Context::named("after-shutdown").unwrap();
        ctx.initialize().unwrap();
        ctx.shutdown();
        ctx.join();

        let (tx, _rx) = flume::unbounded();
        let err = ctx
            .register(
                Registration::new()
                    .socket_type(crate::SocketType::Pub)
                    .configurator(|_| Ok(()))
                    .incoming(tx),
            )
            .unwrap_err();
        assert!(matches!(err, DriveshaftError::Terminated));
    }
}
