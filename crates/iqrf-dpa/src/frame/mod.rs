// crates/iqrf-dpa/src/frame/mod.rs
//! DPA frame layout, codec and classification.

use crate::channel::DpaError;
use crate::types::{PCMD_RESPONSE_FLAG, STATUS_ASYNC_RESPONSE, STATUS_CONFIRMATION};
use std::fmt;

/// Size of the DPA buffer; no frame may exceed it.
pub const MAX_FRAME_SIZE: usize = 64;
/// Length of the header common to requests and responses:
/// NADR (2) + PNUM (1) + PCMD (1) + HWPID (2).
pub const HEADER_SIZE: usize = 6;
/// A response carries ResponseCode and DpaValue between header and PData.
pub const RESPONSE_HEADER_SIZE: usize = HEADER_SIZE + 2;

const NADR_OFFSET: usize = 0;
const PNUM_OFFSET: usize = 2;
const PCMD_OFFSET: usize = 3;
const HWPID_OFFSET: usize = 4;
const RESPONSE_CODE_OFFSET: usize = 6;
const DPA_VALUE_OFFSET: usize = 7;

/// Classification of a frame taken off the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// PCMD has the response bit clear. On the receive path this is an
    /// unsolicited request arriving from the mesh.
    Request,
    /// A response frame whose status is `STATUS_CONFIRMATION`; the local
    /// coordinator acknowledges mesh dispatch and reports routing data.
    Confirmation,
    /// A solicited response to the request in flight.
    Response,
    /// A response frame flagged `STATUS_ASYNC_RESPONSE`; not tied to any
    /// transaction.
    AsyncNotification,
}

/// Routing fields of a confirmation frame, used for deadline estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationData {
    /// Hops the request travels to reach the addressee.
    pub hops: u8,
    /// Length of one routing time slot, in units of 10 ms.
    pub timeslot_length: u8,
    /// Hops the response travels back.
    pub hops_response: u8,
}

/// One DPA frame, request or response, stored verbatim.
///
/// The backing buffer is zero initialized; bytes past `len` always read as
/// zero, which matches the wire behavior of the coordinator module for
/// absent optional fields.
#[derive(Clone, PartialEq, Eq)]
pub struct DpaFrame {
    buf: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl DpaFrame {
    /// Builds a request frame from its logical fields.
    ///
    /// Fails when header plus payload would not fit the DPA buffer.
    pub fn request(
        nadr: u16,
        pnum: u8,
        pcmd: u8,
        hwpid: u16,
        pdata: &[u8],
    ) -> Result<Self, DpaError> {
        let len = HEADER_SIZE + pdata.len();
        if len > MAX_FRAME_SIZE {
            return Err(DpaError::RequestTooLong(len));
        }
        let mut buf = [0u8; MAX_FRAME_SIZE];
        buf[NADR_OFFSET..NADR_OFFSET + 2].copy_from_slice(&nadr.to_le_bytes());
        buf[PNUM_OFFSET] = pnum;
        buf[PCMD_OFFSET] = pcmd;
        buf[HWPID_OFFSET..HWPID_OFFSET + 2].copy_from_slice(&hwpid.to_le_bytes());
        buf[HEADER_SIZE..len].copy_from_slice(pdata);
        Ok(Self { buf, len })
    }

    /// Stores a received buffer verbatim.
    ///
    /// Only the length is validated; a short or structurally odd frame is
    /// kept as-is and classified later.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DpaError> {
        if data.is_empty() {
            return Err(DpaError::EmptyFrame);
        }
        if data.len() > MAX_FRAME_SIZE {
            return Err(DpaError::FrameTooLong(data.len()));
        }
        let mut buf = [0u8; MAX_FRAME_SIZE];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            buf,
            len: data.len(),
        })
    }

    /// Number of valid bytes in the frame.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A stored frame is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The frame as transmitted on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Network address (little-endian u16 at offset 0).
    pub fn nadr(&self) -> u16 {
        u16::from_le_bytes([self.buf[NADR_OFFSET], self.buf[NADR_OFFSET + 1]])
    }

    /// Peripheral number.
    pub fn pnum(&self) -> u8 {
        self.buf[PNUM_OFFSET]
    }

    /// Peripheral command, including the response bit.
    pub fn pcmd(&self) -> u8 {
        self.buf[PCMD_OFFSET]
    }

    /// Hardware profile id.
    pub fn hwpid(&self) -> u16 {
        u16::from_le_bytes([self.buf[HWPID_OFFSET], self.buf[HWPID_OFFSET + 1]])
    }

    /// DPA status code; meaningful for responses only.
    pub fn response_code(&self) -> u8 {
        self.buf[RESPONSE_CODE_OFFSET]
    }

    /// DPA value byte; meaningful for responses only.
    pub fn dpa_value(&self) -> u8 {
        self.buf[DPA_VALUE_OFFSET]
    }

    /// Peripheral payload of a request.
    pub fn pdata(&self) -> &[u8] {
        if self.len > HEADER_SIZE {
            &self.buf[HEADER_SIZE..self.len]
        } else {
            &[]
        }
    }

    /// Peripheral payload of a response (past ResponseCode and DpaValue).
    pub fn response_data(&self) -> &[u8] {
        if self.len > RESPONSE_HEADER_SIZE {
            &self.buf[RESPONSE_HEADER_SIZE..self.len]
        } else {
            &[]
        }
    }

    /// Classifies the frame.
    ///
    /// Frames shorter than the PCMD field are treated as requests; they are
    /// malformed but rejecting them is the caller's policy, not the codec's.
    pub fn direction(&self) -> Direction {
        if self.len <= PCMD_OFFSET {
            return Direction::Request;
        }
        if self.buf[PCMD_OFFSET] & PCMD_RESPONSE_FLAG == 0 {
            return Direction::Request;
        }
        let response_code = self.buf[RESPONSE_CODE_OFFSET];
        if response_code == STATUS_CONFIRMATION && self.len > HEADER_SIZE {
            Direction::Confirmation
        } else if response_code & STATUS_ASYNC_RESPONSE != 0 {
            Direction::AsyncNotification
        } else {
            Direction::Response
        }
    }

    /// Routing fields when the frame is a confirmation.
    pub fn confirmation(&self) -> Option<ConfirmationData> {
        if self.direction() != Direction::Confirmation {
            return None;
        }
        Some(ConfirmationData {
            hops: self.buf[RESPONSE_HEADER_SIZE],
            timeslot_length: self.buf[RESPONSE_HEADER_SIZE + 1],
            hops_response: self.buf[RESPONSE_HEADER_SIZE + 2],
        })
    }
}

impl fmt::Debug for DpaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DpaFrame[")?;
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "]")
    }
}
