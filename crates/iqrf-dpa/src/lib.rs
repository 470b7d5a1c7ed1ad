//! Host-side driver for the IQRF DPA protocol.
//!
//! The engine serializes DPA transactions over one serial link to the local
//! coordinator module, estimates per-transaction deadlines from the mesh
//! routing data carried by confirmation frames, and splits inbound traffic
//! into solicited and asynchronous messages. Byte-level transports plug in
//! behind the [`DpaChannel`] trait.

// --- Foundation Modules ---
pub mod channel;
pub mod types;

// --- Frame Layer ---
pub mod frame;

// --- Transaction Engine ---
pub mod handler;
pub mod timing;
pub mod transaction;

// --- Peripheral Tasks ---
pub mod peripheral;

// --- Top-level Exports ---
pub use channel::{ChannelState, DpaChannel, DpaError, ReceiveHandler};
pub use frame::{ConfirmationData, Direction, DpaFrame};
pub use handler::{AsyncMessageHandler, DpaHandler};
pub use peripheral::DpaTask;
pub use timing::{FrcResponseTime, RfMode, TimingParams};
pub use transaction::{DpaTransactionHandle, ErrorCode, TransactionResult, TransactionState};
