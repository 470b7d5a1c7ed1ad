// crates/iqrf-dpa/src/transaction/result.rs

use crate::frame::DpaFrame;
use crate::types::{
    ERROR_ADDR, ERROR_DATA, ERROR_DATA_LEN, ERROR_FAIL, ERROR_HWPID,
    ERROR_IFACE_CUSTOM_HANDLER, ERROR_MISSING_CUSTOM_DPA_HANDLER, ERROR_NADR, ERROR_PCMD,
    ERROR_PNUM, STATUS_CONFIRMATION, STATUS_NO_ERROR,
};
use std::fmt;
use std::time::SystemTime;

/// Outcome classification of a DPA transaction.
///
/// Negative codes originate on the host, zero is success, positive codes
/// mirror the wire status of the DPA response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Channel locked by another consumer.
    IfaceExclusiveAccess,
    /// A received frame violates the frame invariants.
    BadResponse,
    /// The request violates the frame invariants.
    BadRequest,
    /// The transaction never started within the user timeout.
    IfaceBusy,
    /// The transport reported a failure during send.
    Iface,
    /// The client aborted the transaction.
    Aborted,
    /// The submission exceeded the dispatcher queue bound.
    IfaceQueueFull,
    /// The deadline expired before the expected frame arrived.
    Timeout,
    /// Success; inspect the wire response code for peripheral-level status.
    Ok,
    /// General failure reported by the node.
    Fail,
    /// The node rejected the peripheral command.
    Pcmd,
    /// The node rejected the peripheral number.
    Pnum,
    /// The node rejected the address.
    Addr,
    /// The node rejected the data length.
    DataLen,
    /// The node rejected the data.
    Data,
    /// The node rejected the hardware profile id.
    Hwpid,
    /// The node rejected the network address.
    Nadr,
    /// A custom DPA handler reported an interface error.
    IfaceCustomHandler,
    /// The addressed custom DPA handler is not present.
    MissingCustomDpaHandler,
    /// Status code from the custom handler user range (0x20..=0x3F) or any
    /// other unassigned wire value.
    User(u8),
    /// The wire status of a confirmation leaked into a result.
    Confirmation,
}

impl ErrorCode {
    /// Numeric code; negative for host-originated errors, the wire status
    /// otherwise.
    pub fn code(self) -> i32 {
        match self {
            Self::IfaceExclusiveAccess => -8,
            Self::BadResponse => -7,
            Self::BadRequest => -6,
            Self::IfaceBusy => -5,
            Self::Iface => -4,
            Self::Aborted => -3,
            Self::IfaceQueueFull => -2,
            Self::Timeout => -1,
            Self::Ok => i32::from(STATUS_NO_ERROR),
            Self::Fail => i32::from(ERROR_FAIL),
            Self::Pcmd => i32::from(ERROR_PCMD),
            Self::Pnum => i32::from(ERROR_PNUM),
            Self::Addr => i32::from(ERROR_ADDR),
            Self::DataLen => i32::from(ERROR_DATA_LEN),
            Self::Data => i32::from(ERROR_DATA),
            Self::Hwpid => i32::from(ERROR_HWPID),
            Self::Nadr => i32::from(ERROR_NADR),
            Self::IfaceCustomHandler => i32::from(ERROR_IFACE_CUSTOM_HANDLER),
            Self::MissingCustomDpaHandler => i32::from(ERROR_MISSING_CUSTOM_DPA_HANDLER),
            Self::User(code) => i32::from(code),
            Self::Confirmation => i32::from(STATUS_CONFIRMATION),
        }
    }

    /// Maps a wire response status to the matching code.
    pub fn from_response_code(code: u8) -> Self {
        match code {
            STATUS_NO_ERROR => Self::Ok,
            ERROR_FAIL => Self::Fail,
            ERROR_PCMD => Self::Pcmd,
            ERROR_PNUM => Self::Pnum,
            ERROR_ADDR => Self::Addr,
            ERROR_DATA_LEN => Self::DataLen,
            ERROR_DATA => Self::Data,
            ERROR_HWPID => Self::Hwpid,
            ERROR_NADR => Self::Nadr,
            ERROR_IFACE_CUSTOM_HANDLER => Self::IfaceCustomHandler,
            ERROR_MISSING_CUSTOM_DPA_HANDLER => Self::MissingCustomDpaHandler,
            STATUS_CONFIRMATION => Self::Confirmation,
            other => Self::User(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IfaceExclusiveAccess => write!(f, "ERROR_IFACE_EXCLUSIVE_ACCESS"),
            Self::BadResponse => write!(f, "BAD_RESPONSE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::IfaceBusy => write!(f, "ERROR_IFACE_BUSY"),
            Self::Iface => write!(f, "ERROR_IFACE"),
            Self::Aborted => write!(f, "ERROR_ABORTED"),
            Self::IfaceQueueFull => write!(f, "ERROR_IFACE_QUEUE_FULL"),
            Self::Timeout => write!(f, "ERROR_TIMEOUT"),
            Self::Ok => write!(f, "ok"),
            Self::Fail => write!(f, "ERROR_FAIL"),
            Self::Pcmd => write!(f, "ERROR_PCMD"),
            Self::Pnum => write!(f, "ERROR_PNUM"),
            Self::Addr => write!(f, "ERROR_ADDR"),
            Self::DataLen => write!(f, "ERROR_DATA_LEN"),
            Self::Data => write!(f, "ERROR_DATA"),
            Self::Hwpid => write!(f, "ERROR_HWPID"),
            Self::Nadr => write!(f, "ERROR_NADR"),
            Self::IfaceCustomHandler => write!(f, "ERROR_IFACE_CUSTOM_HANDLER"),
            Self::MissingCustomDpaHandler => write!(f, "ERROR_MISSING_CUSTOM_DPA_HANDLER"),
            Self::User(code) => write!(f, "ERROR_USER_{:#04x}", code),
            Self::Confirmation => write!(f, "STATUS_CONFIRMATION"),
        }
    }
}

/// Everything a finished transaction hands back to the submitter.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    request: DpaFrame,
    confirmation: Option<DpaFrame>,
    response: Option<DpaFrame>,
    request_ts: SystemTime,
    confirmation_ts: Option<SystemTime>,
    response_ts: Option<SystemTime>,
    error: ErrorCode,
    response_code: u8,
}

impl TransactionResult {
    pub(crate) fn new(request: DpaFrame) -> Self {
        Self {
            request,
            confirmation: None,
            response: None,
            request_ts: SystemTime::now(),
            confirmation_ts: None,
            response_ts: None,
            error: ErrorCode::Iface,
            response_code: STATUS_NO_ERROR,
        }
    }

    /// Effective error code: transaction handling result, or the wire status
    /// when handling itself succeeded.
    pub fn error_code(&self) -> ErrorCode {
        self.error
    }

    /// Readable name of the effective error code.
    pub fn error_string(&self) -> String {
        self.error.to_string()
    }

    pub fn request(&self) -> &DpaFrame {
        &self.request
    }

    pub fn confirmation(&self) -> Option<&DpaFrame> {
        self.confirmation.as_ref()
    }

    pub fn response(&self) -> Option<&DpaFrame> {
        self.response.as_ref()
    }

    pub fn request_ts(&self) -> SystemTime {
        self.request_ts
    }

    pub fn confirmation_ts(&self) -> Option<SystemTime> {
        self.confirmation_ts
    }

    pub fn response_ts(&self) -> Option<SystemTime> {
        self.response_ts
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation.is_some()
    }

    pub fn is_responded(&self) -> bool {
        self.response.is_some()
    }

    pub(crate) fn set_confirmation(&mut self, confirmation: DpaFrame) {
        self.confirmation_ts = Some(SystemTime::now());
        self.confirmation = Some(confirmation);
    }

    pub(crate) fn set_response(&mut self, response: DpaFrame) {
        self.response_ts = Some(SystemTime::now());
        self.response_code = response.response_code();
        self.response = Some(response);
    }

    /// Finalizes the error code. A successful transaction inherits the wire
    /// status of its response.
    pub(crate) fn set_error(&mut self, error: ErrorCode) {
        self.error = if error.is_ok() {
            ErrorCode::from_response_code(self.response_code)
        } else {
            error
        };
    }

    /// Unconditional replacement, bypassing the wire-status mapping.
    pub(crate) fn override_error(&mut self, error: ErrorCode) {
        self.error = error;
    }
}
