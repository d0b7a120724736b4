//! Network Layer
//!
//! Out-of-band signalling between the two peers. This layer is
//! **non-deterministic**: delivery may be late, duplicated or lost. All state
//! changes still go through the protocol moves in `game/`.

pub mod signal;
pub mod transport;
pub mod session;

pub use signal::{
    SignalMessage, SignalError, CommitSignal, GuessSignal, RevealSignal, FullRevealSignal,
};
pub use transport::{
    SignalTransport, SignalHandler, HandlerId, TransportError, LocalBus, WsSignalChannel,
};
pub use session::{PeerSession, SessionError};
