//! Concrete [`Transport`](crate::transport::Transport) implementations

pub mod replay;
#[cfg(feature = "serial")]
pub mod serial;

pub use replay::ReplayTransport;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
