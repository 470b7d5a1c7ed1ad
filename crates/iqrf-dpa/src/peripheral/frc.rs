// crates/iqrf-dpa/src/peripheral/frc.rs
//! Fast Response Command tasks.
//!
//! FRC collects a small amount of data from many nodes in one broadcast
//! round. The data type encoded in the FRC command number determines how
//! many nodes fit the response and how per-node values are laid out.

use super::DpaTask;
use crate::channel::DpaError;
use crate::frame::DpaFrame;
use crate::types::{
    CMD_FRC_EXTRARESULT, CMD_FRC_SEND, CMD_FRC_SEND_SELECTIVE, COORDINATOR_ADDRESS,
    HWPID_DO_NOT_CHECK, PNUM_FRC,
};

/// First user FRC command collecting 2 bits per node.
pub const FRC_USER_BIT_FROM: u8 = 0x40;
/// Last user FRC command collecting 2 bits per node.
pub const FRC_USER_BIT_TO: u8 = 0x7F;
/// First user FRC command collecting one byte per node.
pub const FRC_USER_BYTE_FROM: u8 = 0xC0;
/// Last user FRC command collecting one byte per node.
pub const FRC_USER_BYTE_TO: u8 = 0xDF;
/// First user FRC command collecting two bytes per node.
pub const FRC_USER_2BYTE_FROM: u8 = 0xF0;
/// Last user FRC command collecting two bytes per node.
pub const FRC_USER_2BYTE_TO: u8 = 0xF7;

/// User data bounds of an FRC request.
pub const FRC_MIN_USER_DATA: usize = 2;
pub const FRC_MAX_USER_DATA: usize = 30;

/// Data collected per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrcDataType {
    /// Two bits per node; up to 239 nodes.
    Bit2,
    /// One byte per node; up to 62 nodes without the extra result.
    Byte,
    /// Two bytes per node; up to 30 nodes without the extra result.
    Byte2,
}

impl FrcDataType {
    /// Base of the user FRC command range of this type.
    pub fn user_base(self) -> u8 {
        match self {
            Self::Bit2 => FRC_USER_BIT_FROM,
            Self::Byte => FRC_USER_BYTE_FROM,
            Self::Byte2 => FRC_USER_2BYTE_FROM,
        }
    }

    /// Width of the user FRC command range of this type.
    fn user_range(self) -> u8 {
        match self {
            Self::Bit2 => FRC_USER_BIT_TO - FRC_USER_BIT_FROM,
            Self::Byte => FRC_USER_BYTE_TO - FRC_USER_BYTE_FROM,
            Self::Byte2 => FRC_USER_2BYTE_TO - FRC_USER_2BYTE_FROM,
        }
    }

    /// Highest node address whose data fits the plain FRC response.
    pub fn max_node(self) -> u16 {
        match self {
            Self::Bit2 => 239,
            Self::Byte => 62,
            Self::Byte2 => 30,
        }
    }

}

/// Predefined (embedded) FRC commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrcCommand {
    Ping = 0x00,
    AcknowledgedBroadcastBits = 0x02,
    PrebondedAlive = 0x03,
    SupplyVoltage = 0x04,
    Temperature = 0x80,
    AcknowledgedBroadcastBytes = 0x81,
    MemoryRead = 0x82,
    MemoryReadPlus1 = 0x83,
    FrcResponseTime = 0x84,
}

impl FrcCommand {
    pub fn data_type(self) -> FrcDataType {
        if (self as u8) < 0x80 {
            FrcDataType::Bit2
        } else {
            FrcDataType::Byte
        }
    }
}

/// FRC Send / SendSelective task addressed to the coordinator.
#[derive(Debug, Clone)]
pub struct Frc {
    pcmd: u8,
    frc_command: u8,
    data_type: FrcDataType,
    user_data: Vec<u8>,
    /// Selected nodes bitmap, SendSelective only.
    selected_nodes: Vec<u8>,
    status: Option<u8>,
    data: Vec<u8>,
}

impl Frc {
    /// FRC round with a predefined command.
    pub fn send(command: FrcCommand, user_data: &[u8]) -> Result<Self, DpaError> {
        Self::build(CMD_FRC_SEND, command as u8, command.data_type(), user_data)
    }

    /// FRC round with a user command of the given type. `user_offset` is the
    /// offset within the type's user command range.
    pub fn send_user(
        data_type: FrcDataType,
        user_offset: u8,
        user_data: &[u8],
    ) -> Result<Self, DpaError> {
        if user_offset > data_type.user_range() {
            return Err(DpaError::InvalidArgument("user FRC command offset"));
        }
        Self::build(
            CMD_FRC_SEND,
            data_type.user_base() + user_offset,
            data_type,
            user_data,
        )
    }

    /// Selective FRC round with a predefined command; `nodes` lists the node
    /// addresses to involve.
    pub fn send_selective(
        command: FrcCommand,
        nodes: &[u16],
        user_data: &[u8],
    ) -> Result<Self, DpaError> {
        let mut task = Self::build(
            CMD_FRC_SEND_SELECTIVE,
            command as u8,
            command.data_type(),
            user_data,
        )?;
        let mut bitmap = vec![0u8; 30];
        for &node in nodes {
            if node == 0 || node > 239 {
                continue;
            }
            bitmap[usize::from(node) / 8] |= 1 << (node % 8);
        }
        task.selected_nodes = bitmap;
        Ok(task)
    }

    /// Reads the remainder of the collected data after a Send.
    pub fn extra_result() -> Self {
        Self {
            pcmd: CMD_FRC_EXTRARESULT,
            frc_command: 0,
            data_type: FrcDataType::Byte,
            user_data: Vec::new(),
            selected_nodes: Vec::new(),
            status: None,
            data: Vec::new(),
        }
    }

    fn build(
        pcmd: u8,
        frc_command: u8,
        data_type: FrcDataType,
        user_data: &[u8],
    ) -> Result<Self, DpaError> {
        if user_data.len() < FRC_MIN_USER_DATA || user_data.len() > FRC_MAX_USER_DATA {
            return Err(DpaError::InvalidArgument("FRC user data size"));
        }
        Ok(Self {
            pcmd,
            frc_command,
            data_type,
            user_data: user_data.to_vec(),
            selected_nodes: Vec::new(),
            status: None,
            data: Vec::new(),
        })
    }

    /// FRC command number carried in the request.
    pub fn frc_command(&self) -> u8 {
        self.frc_command
    }

    pub fn data_type(&self) -> FrcDataType {
        self.data_type
    }

    /// Status byte of the FRC response: number of responded nodes, or an
    /// error code above 0xEF.
    pub fn status(&self) -> Option<u8> {
        self.status
    }

    /// Two-bit value collected from the node, `Bit2` rounds only.
    pub fn data_bit2(&self, address: u16) -> u8 {
        if address == 0 || address > self.data_type.max_node() {
            return 0;
        }
        let index = usize::from(address) / 8;
        let bit = address % 8;
        if index >= 32 || 32 + index >= self.data.len() {
            return 0;
        }
        let bit0 = (self.data[index] >> bit) & 0x01;
        let bit1 = (self.data[32 + index] >> bit) & 0x01;
        (bit1 << 1) | bit0
    }

    /// Byte collected from the node, `Byte` rounds only.
    pub fn data_byte(&self, address: u16) -> u8 {
        if address == 0 || address > self.data_type.max_node() {
            return 0;
        }
        self.data.get(usize::from(address)).copied().unwrap_or(0)
    }

    /// Two bytes collected from the node, `Byte2` rounds only.
    pub fn data_byte2(&self, address: u16) -> u16 {
        if address == 0 || address > self.data_type.max_node() {
            return 0;
        }
        let index = usize::from(address) * 2;
        match (self.data.get(index), self.data.get(index + 1)) {
            (Some(&low), Some(&high)) => u16::from_le_bytes([low, high]),
            _ => 0,
        }
    }
}

impl DpaTask for Frc {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        let mut pdata = Vec::new();
        if self.pcmd != CMD_FRC_EXTRARESULT {
            pdata.push(self.frc_command);
            if self.pcmd == CMD_FRC_SEND_SELECTIVE {
                pdata.extend_from_slice(&self.selected_nodes);
            }
            pdata.extend_from_slice(&self.user_data);
        }
        DpaFrame::request(
            COORDINATOR_ADDRESS,
            PNUM_FRC,
            self.pcmd,
            HWPID_DO_NOT_CHECK,
            &pdata,
        )
    }

    fn timeout_ms(&self) -> i32 {
        // FRC rounds routinely exceed the engine default.
        2_000
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_FRC {
            return Err(DpaError::UnexpectedResponse);
        }
        let data = response.response_data();
        if self.pcmd == CMD_FRC_EXTRARESULT {
            self.data = data.to_vec();
            return Ok(());
        }
        if data.is_empty() {
            return Err(DpaError::ResponseTooShort(0));
        }
        self.status = Some(data[0]);
        self.data = data[1..].to_vec();
        Ok(())
    }
}
