//! Socket type enumeration.
//!
//! The accepted vocabulary mirrors the classic ZeroMQ socket types,
//! including the legacy `xreq`/`xrep` names.

use std::fmt;
use std::str::FromStr;

use crate::error::DriveshaftError;

/// ZeroMQ socket types accepted at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// PAIR socket for exclusive bidirectional communication.
    Pair,
    /// PUB socket for publishing messages to subscribers.
    Pub,
    /// SUB socket for subscribing to published messages.
    Sub,
    /// REQ socket for synchronous request-reply clients.
    Req,
    /// REP socket for synchronous request-reply servers.
    Rep,
    /// Legacy name for [`SocketType::Dealer`].
    XReq,
    /// Legacy name for [`SocketType::Router`].
    XRep,
    /// DEALER socket for asynchronous request-reply patterns.
    Dealer,
    /// ROUTER socket for routing messages by identity.
    Router,
    /// XPUB socket, a publisher with subscription visibility.
    XPub,
    /// XSUB socket, a subscriber with explicit subscription messages.
    XSub,
    /// PULL socket for receiving from pushers.
    Pull,
    /// PUSH socket for sending to pullers.
    Push,
}

const ALL: [SocketType; 13] = [
    SocketType::Pair,
    SocketType::Pub,
    SocketType::Sub,
    SocketType::Req,
    SocketType::Rep,
    SocketType::XReq,
    SocketType::XRep,
    SocketType::Dealer,
    SocketType::Router,
    SocketType::XPub,
    SocketType::XSub,
    SocketType::Pull,
    SocketType::Push,
];

impl SocketType {
    /// Parse a socket type by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DriveshaftError::UnknownSocketType`] for names outside
    /// the accepted vocabulary.
    pub fn from_name(name: &str) -> Result<Self, DriveshaftError> {
        ALL.iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| DriveshaftError::UnknownSocketType(name.to_owned()))
    }

    /// The socket type's name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "pair",
            Self::Pub => "pub",
            Self::Sub => "sub",
            Self::Req => "req",
            Self::Rep => "rep",
            Self::XReq => "xreq",
            Self::XRep => "xrep",
            Self::Dealer => "dealer",
            Self::Router => "router",
            Self::XPub => "xpub",
            Self::XSub => "xsub",
            Self::Pull => "pull",
            Self::Push => "push",
        }
    }

    /// Map onto the library enum. `xreq` and `xrep` are the legacy names
    /// of `dealer` and `router`.
    pub(crate) fn to_zmq(self) -> zmq::SocketType {
        match self {
            Self::Pair => zmq::PAIR,
            Self::Pub => zmq::PUB,
            Self::Sub => zmq::SUB,
            Self::Req => zmq::REQ,
            Self::Rep => zmq::REP,
            Self::XReq | Self::Dealer => zmq::DEALER,
            Self::XRep | Self::Router => zmq::ROUTER,
            Self::XPub => zmq::XPUB,
            Self::XSub => zmq::XSUB,
            Self::Pull => zmq::PULL,
            Self::Push => zmq::PUSH,
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SocketType {
    type Err = DriveshaftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
