// crates/iqrf-dpa/src/peripheral/led.rs

use super::DpaTask;
use crate::channel::DpaError;
use crate::frame::DpaFrame;
use crate::types::{
    CMD_LED_FLASHING, CMD_LED_PULSE, CMD_LED_SET_OFF, CMD_LED_SET_ON, HWPID_DO_NOT_CHECK,
    PNUM_LEDG, PNUM_LEDR,
};

/// The two LEDs a TR module carries, each its own peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColour {
    Red,
    Green,
}

impl LedColour {
    pub fn pnum(self) -> u8 {
        match self {
            Self::Red => PNUM_LEDR,
            Self::Green => PNUM_LEDG,
        }
    }
}

/// Commands shared by both LED peripherals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    SetOff,
    SetOn,
    Pulse,
    Flashing,
}

impl LedCommand {
    pub fn pcmd(self) -> u8 {
        match self {
            Self::SetOff => CMD_LED_SET_OFF,
            Self::SetOn => CMD_LED_SET_ON,
            Self::Pulse => CMD_LED_PULSE,
            Self::Flashing => CMD_LED_FLASHING,
        }
    }
}

/// LED control task.
#[derive(Debug, Clone)]
pub struct Led {
    colour: LedColour,
    address: u16,
    command: LedCommand,
    hwpid: u16,
}

impl Led {
    pub fn new(colour: LedColour, address: u16, command: LedCommand) -> Self {
        Self {
            colour,
            address,
            command,
            hwpid: HWPID_DO_NOT_CHECK,
        }
    }

    /// Short blink of the selected LED.
    pub fn pulse(colour: LedColour, address: u16) -> Self {
        Self::new(colour, address, LedCommand::Pulse)
    }

    pub fn colour(&self) -> LedColour {
        self.colour
    }

    pub fn command(&self) -> LedCommand {
        self.command
    }
}

impl DpaTask for Led {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        DpaFrame::request(
            self.address,
            self.colour.pnum(),
            self.command.pcmd(),
            self.hwpid,
            &[],
        )
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        // LED set and pulse responses carry no payload; only the origin is
        // checked.
        if response.pnum() != self.colour.pnum() {
            return Err(DpaError::UnexpectedResponse);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_request_encoding() {
        let task = Led::pulse(LedColour::Red, 0x0000);
        let request = task.request().unwrap();
        assert_eq!(request.as_bytes(), &[0x00, 0x00, 0x06, 0x03, 0xFF, 0xFF]);
    }

    #[test]
    fn test_green_led_peripheral_number() {
        let task = Led::new(LedColour::Green, 0x0003, LedCommand::SetOn);
        let request = task.request().unwrap();
        assert_eq!(request.pnum(), PNUM_LEDG);
        assert_eq!(request.pcmd(), CMD_LED_SET_ON);
        assert_eq!(request.nadr(), 0x0003);
    }

    #[test]
    fn test_response_from_other_peripheral_rejected() {
        let mut task = Led::pulse(LedColour::Red, 0x0000);
        let response =
            DpaFrame::from_bytes(&[0x00, 0x00, 0x07, 0x83, 0xFF, 0xFF, 0x00, 0x00]).unwrap();
        assert_eq!(
            task.parse_response(&response),
            Err(DpaError::UnexpectedResponse)
        );
    }
}
