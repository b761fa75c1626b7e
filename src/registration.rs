//! Socket registration.
//!
//! A [`Registration`] describes one socket to bring under the bridge:
//! where the socket comes from (pre-built, or a type plus a configurator
//! that binds/connects it) and which channels the application will drive
//! it through. Validation happens at registration time and raises
//! synchronously; nothing is started for an invalid registration.

use flume::{Receiver, Sender};

use crate::bundle::SocketBundle;
use crate::command::{CommandOutput, SocketFn};
use crate::error::{DriveshaftError, Result};
use crate::payload::Payload;
use crate::socket_type::SocketType;

/// Closure that finishes configuring a freshly created socket. It is
/// responsible for binding or connecting.
pub type Configurator = Box<dyn FnOnce(&zmq::Socket) -> Result<()> + Send>;

/// Builder describing one socket to bridge.
///
/// Exactly one socket source must be given: either a pre-built socket,
/// or a socket type together with a configurator. At least one of the
/// `outgoing` and `incoming` channels must be given.
///
/// # Examples
///
/// ```rust,no_run
/// use driveshaft::{Payload, Registration, SocketType};
///
/// # fn main() -> driveshaft::Result<()> {
/// let (out_tx, out_rx) = flume::unbounded::<Payload>();
/// driveshaft::register(
///     Registration::new()
///         .socket_type(SocketType::Sub)
///         .configurator(|s| {
///             s.set_subscribe(b"")?;
///             Ok(s.connect("tcp://127.0.0.1:5556")?)
///         })
///         .incoming(out_tx),
/// )?;
/// # drop(out_rx);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Registration {
    socket: Option<zmq::Socket>,
    socket_type: Option<SocketType>,
    configurator: Option<Configurator>,
    outgoing: Option<Receiver<Payload>>,
    incoming: Option<Sender<Payload>>,
    commands: Option<Receiver<SocketFn>>,
    replies: Option<Sender<CommandOutput>>,
}

impl Registration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge a pre-built socket. Mutually exclusive with
    /// [`socket_type`](Self::socket_type) / [`configurator`](Self::configurator).
    ///
    /// The socket must come from the context's [`zmq::Context`] if it is
    /// to share the context's `inproc` namespace.
    #[must_use]
    pub fn socket(mut self, socket: zmq::Socket) -> Self {
        self.socket = Some(socket);
        self
    }

    /// Create the socket from a type; requires a configurator.
    #[must_use]
    pub fn socket_type(mut self, socket_type: SocketType) -> Self {
        self.socket_type = Some(socket_type);
        self
    }

    /// Closure run on the freshly created socket; it must bind or
    /// connect.
    #[must_use]
    pub fn configurator(
        mut self,
        configure: impl FnOnce(&zmq::Socket) -> Result<()> + Send + 'static,
    ) -> Self {
        self.configurator = Some(Box::new(configure));
        self
    }

    /// Channel the application sends payloads on; the bridge transmits
    /// them on the socket. Its capacity, together with the command
    /// queue's, bounds the application's send rate.
    #[must_use]
    pub fn outgoing(mut self, outgoing: Receiver<Payload>) -> Self {
        self.outgoing = Some(outgoing);
        self
    }

    /// Channel the bridge delivers received payloads on. Deliveries are
    /// non-blocking: keep it drained or messages are dropped.
    #[must_use]
    pub fn incoming(mut self, incoming: Sender<Payload>) -> Self {
        self.incoming = Some(incoming);
        self
    }

    /// Channel the application sends [`SocketFn`] closures on, to be run
    /// against the socket on the socket thread.
    #[must_use]
    pub fn commands(mut self, commands: Receiver<SocketFn>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Channel the bridge delivers non-null command results on.
    /// Deliveries are non-blocking, like `incoming`.
    #[must_use]
    pub fn replies(mut self, replies: Sender<CommandOutput>) -> Self {
        self.replies = Some(replies);
        self
    }

    /// Validate and split into the socket source and the channel bundle.
    pub(crate) fn into_parts(self) -> Result<(SocketSource, SocketBundle)> {
        if self.outgoing.is_none() && self.incoming.is_none() {
            return Err(DriveshaftError::usage(
                "registration needs at least one of the outgoing and incoming channels",
            ));
        }
        let source = match (self.socket, self.socket_type, self.configurator) {
            (Some(socket), None, None) => SocketSource::Prebuilt(socket),
            (None, Some(socket_type), Some(configure)) => SocketSource::Build {
                socket_type,
                configure,
            },
            (Some(_), _, _) => {
                return Err(DriveshaftError::usage(
                    "a pre-built socket excludes socket_type and configurator",
                ));
            }
            (None, _, _) => {
                return Err(DriveshaftError::usage(
                    "registration needs either a pre-built socket or both socket_type and configurator",
                ));
            }
        };
        Ok((
            source,
            SocketBundle {
                outgoing: self.outgoing,
                incoming: self.incoming,
                commands: self.commands,
                replies: self.replies,
            },
        ))
    }
}

/// Where the socket comes from.
pub(crate) enum SocketSource {
    Prebuilt(zmq::Socket),
    Build {
        socket_type: SocketType,
        configure: Configurator,
    },
}

impl SocketSource {
    /// Produce the socket, creating and configuring it when needed. Runs
    /// on the registering thread; the socket is handed to the socket
    /// thread afterwards and never touched here again.
    pub(crate) fn into_socket(self, ctx: &zmq::Context) -> Result<zmq::Socket> {
        match self {
            Self::Prebuilt(socket) => Ok(socket),
            Self::Build {
                socket_type,
                configure,
            } => {
                let socket = ctx.socket(socket_type.to_zmq())?;
                configure(&socket)?;
                Ok(socket)
            }
        }
    }
}
