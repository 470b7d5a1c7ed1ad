// crates/iqrf-dpa/src/channel.rs

use std::fmt;

/// Defines a portable, descriptive Error type for the DPA driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpaError {
    /// The assembled request does not fit the 64 byte DPA buffer.
    RequestTooLong(usize),
    /// The request is shorter than the DPA header and cannot be transmitted.
    RequestTooShort(usize),
    /// A received buffer of zero length cannot be a DPA frame.
    EmptyFrame,
    /// A received buffer exceeds the 64 byte DPA buffer.
    FrameTooLong(usize),
    /// A response is too short to carry the fields a parser expected.
    ResponseTooShort(usize),
    /// A response does not belong to the peripheral or command of the task.
    UnexpectedResponse,
    /// A task was built with an argument outside its documented range.
    InvalidArgument(&'static str),
    /// The transport failed to accept a write.
    ChannelIo(&'static str),
    /// The transport is not open or not in a communicating state.
    NotReady,
    /// The channel is held by another consumer with exclusive access.
    ExclusiveAccess,
    /// The engine worker has been shut down; no more submissions.
    EngineStopped,
}

impl fmt::Display for DpaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestTooLong(len) => write!(f, "Request of {} bytes exceeds DPA buffer", len),
            Self::RequestTooShort(len) => {
                write!(f, "Request of {} bytes is shorter than the DPA header", len)
            }
            Self::EmptyFrame => write!(f, "Zero length frame"),
            Self::FrameTooLong(len) => write!(f, "Frame of {} bytes exceeds DPA buffer", len),
            Self::ResponseTooShort(len) => {
                write!(f, "Response payload of {} bytes is too short", len)
            }
            Self::UnexpectedResponse => write!(f, "Response does not match the task"),
            Self::InvalidArgument(s) => write!(f, "Invalid argument: {}", s),
            Self::ChannelIo(s) => write!(f, "Channel I/O error: {}", s),
            Self::NotReady => write!(f, "Channel not ready"),
            Self::ExclusiveAccess => write!(f, "Channel locked by another consumer"),
            Self::EngineStopped => write!(f, "Engine has been shut down"),
        }
    }
}

impl std::error::Error for DpaError {}

/// Liveness hint reported by a channel implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Open and in communication mode; frames flow both ways.
    ReadyComm,
    /// Open but not in communication mode (e.g. programming mode).
    Ready,
    /// Closed or failed.
    NotReady,
}

/// Callback invoked by the transport once per complete inbound frame.
///
/// The transport may call it from its own reader thread at any time.
pub type ReceiveHandler = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Abstraction of the serial link to the coordinator module.
///
/// This trait decouples the transaction engine from the byte-level
/// transport (USB-CDC, SPI, a test double). Implementations own their
/// framing; the engine only ever sees complete DPA frames.
pub trait DpaChannel: Send + Sync {
    /// Hands one outbound frame to the transport layer.
    ///
    /// Returns once the bytes are accepted for transmission. A failure is
    /// terminal for the transaction being sent.
    fn send(&self, data: &[u8]) -> Result<(), DpaError>;

    /// Installs the single receive handler, replacing any previous one.
    fn register_receiver(&self, handler: ReceiveHandler);

    /// Reports the current link state.
    fn state(&self) -> ChannelState;
}
