// crates/iqrf-dpa/src/peripheral/thermometer.rs

use super::DpaTask;
use crate::channel::DpaError;
use crate::frame::DpaFrame;
use crate::types::{CMD_THERMOMETER_READ, HWPID_DO_NOT_CHECK, PNUM_THERMOMETER};

/// Decoded thermometer reading.
///
/// The peripheral reports a whole-degree value and a 1/16 °C value, both in
/// sign-magnitude form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    /// Raw 8-bit whole-degree value.
    pub raw_value: u8,
    /// Raw 16-bit value in sixteenths of a degree.
    pub raw_sixteenths: u16,
    /// Whole degrees Celsius.
    pub whole_degrees: i32,
    /// Degrees Celsius at 1/16 resolution.
    pub celsius: f32,
}

/// On-board thermometer read task.
#[derive(Debug, Clone)]
pub struct Thermometer {
    address: u16,
    hwpid: u16,
    temperature: Option<Temperature>,
}

impl Thermometer {
    pub fn new(address: u16) -> Self {
        Self {
            address,
            hwpid: HWPID_DO_NOT_CHECK,
            temperature: None,
        }
    }

    /// The reading of the last parsed response.
    pub fn temperature(&self) -> Option<Temperature> {
        self.temperature
    }
}

impl DpaTask for Thermometer {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        DpaFrame::request(
            self.address,
            PNUM_THERMOMETER,
            CMD_THERMOMETER_READ,
            self.hwpid,
            &[],
        )
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_THERMOMETER {
            return Err(DpaError::UnexpectedResponse);
        }
        let data = response.response_data();
        if data.len() < 3 {
            return Err(DpaError::ResponseTooShort(data.len()));
        }

        let raw_value = data[0];
        let raw_sixteenths = u16::from_le_bytes([data[1], data[2]]);

        let whole_degrees = if raw_value & 0x80 != 0 {
            -i32::from(raw_value & 0x7F)
        } else {
            i32::from(raw_value)
        };
        let sixteenths = if raw_sixteenths & 0x8000 != 0 {
            -i32::from(raw_sixteenths & 0x7FFF)
        } else {
            i32::from(raw_sixteenths)
        };

        self.temperature = Some(Temperature {
            raw_value,
            raw_sixteenths,
            whole_degrees,
            celsius: sixteenths as f32 * 0.0625,
        });
        Ok(())
    }
}
