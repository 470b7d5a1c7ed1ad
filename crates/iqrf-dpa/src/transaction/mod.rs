// crates/iqrf-dpa/src/transaction/mod.rs
//! Per-request transaction state machine.
//!
//! A transaction is shared between the submitter (blocked in
//! [`DpaTransactionHandle::get`]) and the dispatcher worker driving the
//! execute loop; the transport receive callback feeds it inbound frames.
//! One mutex and one condition variable cover `state`,
//! `expected_duration_ms` and `finish`. The lock is never held across a
//! channel send.

pub mod result;
pub mod state;

pub use result::{ErrorCode, TransactionResult};
pub use state::TransactionState;

use crate::channel::DpaError;
use crate::frame::{self, ConfirmationData, Direction, DpaFrame};
use crate::timing::{self, RfMode, TimingParams, BOND_TIMEOUT_MS, INFINITE_TIMEOUT};
use crate::types::{
    is_broadcast_address, is_coordinator_address, CMD_COORDINATOR_AUTHORIZE_BOND,
    CMD_COORDINATOR_BOND_NODE, CMD_COORDINATOR_DISCOVERY, CMD_COORDINATOR_SMART_CONNECT,
    CMD_FRC_SEND, CMD_FRC_SEND_SELECTIVE, PCMD_RESPONSE_FLAG, PNUM_COORDINATOR,
};
use log::{debug, info, trace, warn};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

static NEXT_TRANSACTION_ID: AtomicU32 = AtomicU32::new(1);

/// Why an inbound frame was not accepted by the transaction in flight.
///
/// A mismatch is not a transaction failure; the dispatcher logs it and drops
/// the frame, and the transaction keeps waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMismatch {
    /// The frame is neither a confirmation nor a solicited response.
    Direction,
    /// NADR differs from the request in flight.
    NodeAddress,
    /// PNUM differs from the request in flight.
    Peripheral,
    /// PCMD (response bit masked) differs from the request in flight.
    Command,
    /// The transaction already reached a terminal state.
    Finished,
}

impl fmt::Display for FrameMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direction => write!(f, "confirmation or response expected"),
            Self::NodeAddress => write!(f, "node address differs from the sent request"),
            Self::Peripheral => write!(f, "peripheral differs from the sent request"),
            Self::Command => write!(f, "command differs from the sent request"),
            Self::Finished => write!(f, "transaction already finished"),
        }
    }
}

struct Shared {
    state: TransactionState,
    /// Deadline until the next transition, refreshed from confirmations and
    /// responses.
    expected_duration_ms: u32,
    finish: bool,
    /// Routing data of the last confirmation, kept for the response-length
    /// refinement.
    routing: Option<ConfirmationData>,
    default_error: ErrorCode,
    result: TransactionResult,
    /// Set once `get()` snapshots the result; later overrides are ignored.
    result_taken: bool,
}

/// State machine of one submitted request.
pub(crate) struct Transaction {
    id: u32,
    request: DpaFrame,
    rf_mode: RfMode,
    timing: TimingParams,
    /// Normalized user timeout; the engine never waits less than this before
    /// the first inbound frame.
    user_timeout_ms: u32,
    /// Discovery, SmartConnect, AuthorizeBond and FRC sends may wait forever.
    infinite: bool,
    shared: Mutex<Shared>,
    cond: Condvar,
}

impl Transaction {
    pub(crate) fn new(
        request: DpaFrame,
        rf_mode: RfMode,
        timing: TimingParams,
        default_timeout_ms: u32,
        user_timeout_ms: i32,
        default_error: ErrorCode,
    ) -> Self {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        let coordinator = is_coordinator_address(request.nadr());
        let infinite_allowed = coordinator
            && matches!(
                request.pcmd(),
                CMD_COORDINATOR_DISCOVERY
                    | CMD_COORDINATOR_SMART_CONNECT
                    | CMD_COORDINATOR_AUTHORIZE_BOND
                    | CMD_FRC_SEND
                    | CMD_FRC_SEND_SELECTIVE
            );

        let default_ms = default_timeout_ms as i32;
        let mut infinite = false;
        let mut required = user_timeout_ms;
        if required < 0 {
            if infinite_allowed {
                debug!(
                    "transaction {}: infinite wait allowed for coordinator command {:#04x}",
                    id,
                    request.pcmd()
                );
                infinite = true;
            }
            required = default_ms;
        } else if required == INFINITE_TIMEOUT {
            if infinite_allowed {
                infinite = true;
            } else {
                warn!(
                    "transaction {}: infinite timeout not allowed, forced to {} ms",
                    id, default_ms
                );
            }
            required = default_ms;
        } else if required < default_ms {
            warn!(
                "transaction {}: user timeout {} ms raised to {} ms",
                id, required, default_ms
            );
            required = default_ms;
        }

        // Before any estimate exists the deadline is the engine default,
        // stretched for long-running coordinator commands.
        let mut expected = default_timeout_ms;
        if coordinator {
            if required > default_ms {
                expected = required as u32;
            }
            if request.pnum() == PNUM_COORDINATOR
                && request.pcmd() == CMD_COORDINATOR_BOND_NODE
                && user_timeout_ms < 0
            {
                required = BOND_TIMEOUT_MS as i32;
                expected = BOND_TIMEOUT_MS;
                info!("transaction {}: bonding, timeout {} ms", id, BOND_TIMEOUT_MS);
            }
        }

        Self {
            id,
            rf_mode,
            timing,
            user_timeout_ms: required as u32,
            infinite,
            shared: Mutex::new(Shared {
                state: TransactionState::Created,
                expected_duration_ms: expected,
                finish: false,
                routing: None,
                default_error,
                result: TransactionResult::new(request.clone()),
                result_taken: false,
            }),
            cond: Condvar::new(),
            request,
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.shared.lock().unwrap().state
    }

    /// Runs the transaction to a terminal state. Called by the dispatcher
    /// worker; blocks until the transaction finishes.
    pub(crate) fn execute<S>(&self, send: S)
    where
        S: FnOnce(&DpaFrame) -> Result<(), DpaError>,
    {
        let mut shared = self.shared.lock().unwrap();

        if shared.state == TransactionState::Aborted {
            // Aborted while still queued (client or engine shutdown).
            let error = ErrorCode::Aborted;
            self.finalize(&mut shared, error);
            return;
        }

        if shared.default_error == ErrorCode::Ok {
            shared.state = if is_coordinator_address(self.request.nadr()) {
                TransactionState::SentCoordinator
            } else {
                TransactionState::Sent
            };
            drop(shared);
            let sent = send(&self.request);
            shared = self.shared.lock().unwrap();
            if let Err(err) = sent {
                warn!("transaction {}: send failed: {}", self.id, err);
                shared.expected_duration_ms = 0;
                shared.state = TransactionState::InterfaceError;
            }
        } else {
            shared.state = TransactionState::DefaultError;
            shared.expected_duration_ms = 0;
        }

        // First notification: the transaction has started, get() may stop
        // waiting for the dispatcher.
        self.cond.notify_all();

        let mut error_code = ErrorCode::Iface;
        loop {
            let mut expired = false;
            if shared.expected_duration_ms > 0 {
                let wait = Duration::from_millis(u64::from(shared.expected_duration_ms));
                let (guard, timeout) = self.cond.wait_timeout(shared, wait).unwrap();
                shared = guard;
                expired = timeout.timed_out();
            }

            let mut finish = true;
            match shared.state {
                TransactionState::Sent
                | TransactionState::SentCoordinator
                | TransactionState::Confirmation => {
                    if expired && !self.infinite {
                        shared.state = TransactionState::Timeout;
                        error_code = ErrorCode::Timeout;
                    } else {
                        finish = false;
                    }
                }
                TransactionState::ConfirmationBroadcast | TransactionState::ReceivedResponse => {
                    if expired {
                        // The estimated routing window has passed; the air is
                        // free again.
                        shared.state = TransactionState::Processed;
                        error_code = ErrorCode::Ok;
                    } else {
                        finish = false;
                    }
                }
                TransactionState::Processed => error_code = ErrorCode::Ok,
                TransactionState::Timeout => error_code = ErrorCode::Timeout,
                TransactionState::Aborted => error_code = ErrorCode::Aborted,
                TransactionState::InterfaceError => error_code = ErrorCode::Iface,
                TransactionState::DefaultError => error_code = shared.default_error,
                TransactionState::Created => finish = false,
            }

            if finish {
                break;
            }
        }

        self.finalize(&mut shared, error_code);
    }

    /// Finishes the transaction without touching the channel, e.g. when the
    /// dispatcher queue is full.
    pub(crate) fn reject(&self, error: ErrorCode) {
        let mut shared = self.shared.lock().unwrap();
        shared.default_error = error;
        shared.state = TransactionState::DefaultError;
        shared.expected_duration_ms = 0;
        self.finalize(&mut shared, error);
    }

    fn finalize(&self, shared: &mut Shared, error: ErrorCode) {
        shared.result.set_error(error);
        shared.finish = true;
        debug!(
            "transaction {}: finished in state {:?} with {}",
            self.id,
            shared.state,
            shared.result.error_code()
        );
        self.cond.notify_all();
    }

    /// Routes one inbound frame into the state machine.
    ///
    /// Header compatibility is validated before any state is touched; a
    /// mismatched frame leaves the transaction exactly as it was.
    pub(crate) fn process_received(&self, frame: &DpaFrame) -> Result<(), FrameMismatch> {
        let mut shared = self.shared.lock().unwrap();
        if shared.finish {
            return Err(FrameMismatch::Finished);
        }

        let direction = frame.direction();
        if !matches!(direction, Direction::Confirmation | Direction::Response) {
            return Err(FrameMismatch::Direction);
        }
        if frame.nadr() != self.request.nadr() {
            return Err(FrameMismatch::NodeAddress);
        }
        if frame.pnum() != self.request.pnum() {
            return Err(FrameMismatch::Peripheral);
        }
        if frame.pcmd() & !PCMD_RESPONSE_FLAG != self.request.pcmd() {
            return Err(FrameMismatch::Command);
        }

        if direction == Direction::Confirmation {
            shared.state = if is_broadcast_address(frame.nadr()) {
                TransactionState::ConfirmationBroadcast
            } else {
                TransactionState::Confirmation
            };

            if let Some(routing) = frame.confirmation() {
                shared.routing = Some(routing);
                let estimate = timing::estimate_timeout_ms(
                    self.rf_mode,
                    &self.timing.os_version,
                    &routing,
                    None,
                );
                // The user may want to wait longer than the mesh needs.
                shared.expected_duration_ms = estimate.max(self.user_timeout_ms);
                trace!(
                    "transaction {}: confirmation estimate {} ms, waiting {} ms",
                    self.id,
                    estimate,
                    shared.expected_duration_ms
                );
            }
            shared.result.set_confirmation(frame.clone());
            debug!("transaction {}: confirmation processed", self.id);
        } else {
            if shared.state == TransactionState::SentCoordinator || self.infinite {
                // Coordinator requests and infinite waits complete on the
                // spot; nothing else is in the air.
                shared.state = TransactionState::Processed;
            } else {
                shared.state = TransactionState::ReceivedResponse;
                let routing = shared.routing.unwrap_or_default();
                let data_len = frame.len().saturating_sub(frame::RESPONSE_HEADER_SIZE);
                shared.expected_duration_ms = timing::estimate_timeout_ms(
                    self.rf_mode,
                    &self.timing.os_version,
                    &routing,
                    Some(data_len),
                );
                trace!(
                    "transaction {}: response of {} data bytes, cooling off {} ms",
                    self.id,
                    data_len,
                    shared.expected_duration_ms
                );
            }
            shared.result.set_response(frame.clone());
            debug!("transaction {}: response processed", self.id);
        }

        self.cond.notify_all();
        Ok(())
    }

    /// Aborts the transaction; a no-op once it has finished.
    pub(crate) fn abort(&self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.finish {
            return;
        }
        shared.state = TransactionState::Aborted;
        self.cond.notify_all();
    }

    /// Replaces the result error code; ignored once `get()` returned.
    pub(crate) fn override_error(&self, error: ErrorCode) {
        let mut shared = self.shared.lock().unwrap();
        if shared.result_taken {
            warn!(
                "transaction {}: override to {} ignored, result already delivered",
                self.id, error
            );
            return;
        }
        shared.result.override_error(error);
    }

    /// Blocks until the transaction finishes and returns the result.
    ///
    /// If the dispatcher does not start the transaction within the user
    /// timeout the result carries `ERROR_IFACE_BUSY`. Infinite transactions
    /// re-check periodically and keep waiting.
    pub(crate) fn get(&self) -> TransactionResult {
        let mut shared = self.shared.lock().unwrap();

        let start_deadline =
            Instant::now() + Duration::from_millis(u64::from(self.user_timeout_ms));
        while shared.state == TransactionState::Created {
            if self.infinite {
                let wait = Duration::from_millis(u64::from(self.user_timeout_ms));
                let (guard, _) = self.cond.wait_timeout(shared, wait).unwrap();
                shared = guard;
                if shared.state == TransactionState::Created {
                    debug!("transaction {}: not started yet, waiting forever", self.id);
                }
                continue;
            }
            let now = Instant::now();
            if now >= start_deadline {
                warn!(
                    "transaction {}: not started within {} ms",
                    self.id, self.user_timeout_ms
                );
                shared.result.set_error(ErrorCode::IfaceBusy);
                shared.result_taken = true;
                return shared.result.clone();
            }
            let (guard, _) = self.cond.wait_timeout(shared, start_deadline - now).unwrap();
            shared = guard;
        }

        // Started; the execute loop owns the deadline from here on.
        while !shared.finish {
            shared = self.cond.wait(shared).unwrap();
        }
        shared.result_taken = true;
        shared.result.clone()
    }
}

/// Caller-side handle of a submitted transaction.
///
/// Cloneable; all clones observe the same transaction.
#[derive(Clone)]
pub struct DpaTransactionHandle {
    transaction: Arc<Transaction>,
}

impl DpaTransactionHandle {
    pub(crate) fn new(transaction: Arc<Transaction>) -> Self {
        Self { transaction }
    }

    /// Engine-local transaction id, also used in log output.
    pub fn id(&self) -> u32 {
        self.transaction.id()
    }

    /// Current state; mostly useful for diagnostics and tests.
    pub fn state(&self) -> TransactionState {
        self.transaction.state()
    }

    /// Blocks until the transaction finishes and returns the result.
    ///
    /// Returns an `ERROR_IFACE_BUSY` result if the dispatcher does not
    /// start the transaction within the user timeout.
    pub fn get(&self) -> TransactionResult {
        self.transaction.get()
    }

    /// Aborts the transaction immediately.
    pub fn abort(&self) {
        self.transaction.abort()
    }

    /// Replaces the result error code; must be called before `get()`
    /// returns, later calls are ignored.
    pub fn override_error(&self, error: ErrorCode) {
        self.transaction.override_error(error)
    }
}
