//! Connection lifecycle state machine.

use std::fmt;

/// The lifecycle state of a client connection.
///
/// Transitions are strictly ordered, except that any state may jump
/// straight to `Closed` (a dial or handshake failure, an explicit close,
/// or the remote end going away):
///
/// ```text
/// Disconnected → Connecting → Initializing → Ready → Closed
/// ```
///
/// - **Disconnected**: nothing has been dialed yet.
/// - **Connecting**: the duplex transport is being opened.
/// - **Initializing**: `connection_init` was sent, waiting for the ack.
/// - **Ready**: the read loop is running and subscriptions may start.
/// - **Closed**: terminal. Background tasks stop and channels close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Initializing,
    Ready,
    Closed,
}

impl ConnectionState {
    /// Returns `true` if subscriptions may be started.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` once the connection has been torn down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns the next state in the happy path, `None` from `Closed`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Disconnected => Some(Self::Connecting),
            Self::Connecting => Some(Self::Initializing),
            Self::Initializing => Some(Self::Ready),
            Self::Ready => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if moving to `target` is a valid transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        if target == Self::Closed {
            return !self.is_closed();
        }
        self.next() == Some(target)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Ready => write!(f, "Ready"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
