// crates/iqrf-dpa/src/transaction/state.rs

/// Lifecycle states of a DPA transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Constructed, not yet picked up by the dispatcher worker.
    Created,
    /// Request written to the channel, addressed to a node.
    Sent,
    /// Request written to the channel, addressed to the local coordinator;
    /// no confirmation will follow.
    SentCoordinator,
    /// Unicast confirmation received; a response is still expected.
    Confirmation,
    /// Broadcast confirmation received; no response will follow, the engine
    /// waits out the estimated routing window.
    ConfirmationBroadcast,
    /// Response received; the engine cools off for the refined estimate so
    /// follow-up traffic does not collide on the RF air.
    ReceivedResponse,
    /// Finished successfully.
    Processed,
    /// Deadline expired before the expected frame arrived.
    Timeout,
    /// Aborted by the client or by engine shutdown.
    Aborted,
    /// The channel failed while sending the request.
    InterfaceError,
    /// Finished with an error imposed at submission, without touching the
    /// channel.
    DefaultError,
}

impl TransactionState {
    /// Terminal states never transition again; reaching one sets `finish`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Processed
                | Self::Timeout
                | Self::Aborted
                | Self::InterfaceError
                | Self::DefaultError
        )
    }
}
