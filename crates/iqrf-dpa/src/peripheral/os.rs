// crates/iqrf-dpa/src/peripheral/os.rs
//! Tasks for the embedded OS peripheral: module identification, reset,
//! restart and sleep.

use super::DpaTask;
use crate::channel::DpaError;
use crate::frame::DpaFrame;
use crate::types::{
    CMD_OS_READ, CMD_OS_RESET, CMD_OS_RESTART, CMD_OS_SLEEP, HWPID_DO_NOT_CHECK, PNUM_OS,
};

/// Identification data reported by OS Read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module id as printed on the transceiver, e.g. "8100a405".
    pub module_id: String,
    /// IQRF OS version, e.g. "4.02D".
    pub os_version: String,
    /// Transceiver series, e.g. "DCTR-76D".
    pub tr_type: String,
    /// MCU the transceiver carries.
    pub mcu_type: String,
    /// FCC certification flag.
    pub fcc_certified: bool,
    /// IQRF OS build number in hex.
    pub os_build: String,
}

/// OS Read task: identifies the transceiver module.
#[derive(Debug, Clone)]
pub struct OsRead {
    address: u16,
    hwpid: u16,
    info: Option<ModuleInfo>,
}

impl OsRead {
    pub fn new(address: u16) -> Self {
        Self {
            address,
            hwpid: HWPID_DO_NOT_CHECK,
            info: None,
        }
    }

    pub fn module_info(&self) -> Option<&ModuleInfo> {
        self.info.as_ref()
    }
}

impl DpaTask for OsRead {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        DpaFrame::request(self.address, PNUM_OS, CMD_OS_READ, self.hwpid, &[])
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_OS {
            return Err(DpaError::UnexpectedResponse);
        }
        let data = response.response_data();
        if data.len() < 8 {
            return Err(DpaError::ResponseTooShort(data.len()));
        }

        let module_id = format!("{:02x}{:02x}{:02x}{:02x}", data[3], data[2], data[1], data[0]);
        let os_version = format!("{:x}.{:02x}D", data[4] >> 4, data[4] & 0x0F);

        let mut tr_type = if data[3] & 0x80 != 0 {
            String::from("DCTR-")
        } else {
            String::from("TR-")
        };
        tr_type.push_str(match data[5] >> 4 {
            0 => "52D",
            1 => "58D-RJ",
            2 => "72D",
            3 => "53D",
            8 => "54D",
            9 => "55D",
            10 => "56D",
            11 => "76D",
            _ => "???",
        });

        let mcu_type = match data[5] & 0x07 {
            3 => "PIC16F886",
            4 => "PIC16F1938",
            _ => "UNKNOWN",
        };

        self.info = Some(ModuleInfo {
            module_id,
            os_version,
            tr_type,
            mcu_type: mcu_type.to_string(),
            fcc_certified: data[5] & 0x08 != 0,
            os_build: format!("{:04x}", u16::from_le_bytes([data[6], data[7]])),
        });
        Ok(())
    }
}

/// OS Reset task.
#[derive(Debug, Clone)]
pub struct OsReset {
    address: u16,
}

impl OsReset {
    pub fn new(address: u16) -> Self {
        Self { address }
    }
}

impl DpaTask for OsReset {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        DpaFrame::request(self.address, PNUM_OS, CMD_OS_RESET, HWPID_DO_NOT_CHECK, &[])
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_OS {
            return Err(DpaError::UnexpectedResponse);
        }
        Ok(())
    }
}

/// OS Restart task.
#[derive(Debug, Clone)]
pub struct OsRestart {
    address: u16,
}

impl OsRestart {
    pub fn new(address: u16) -> Self {
        Self { address }
    }
}

impl DpaTask for OsRestart {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        DpaFrame::request(
            self.address,
            PNUM_OS,
            CMD_OS_RESTART,
            HWPID_DO_NOT_CHECK,
            &[],
        )
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_OS {
            return Err(DpaError::UnexpectedResponse);
        }
        Ok(())
    }
}

/// OS Sleep task.
///
/// The sleep time travels on the wire in units of 2.097 s, or 32.768 ms when
/// the millisecond flag is set in the control byte.
#[derive(Debug, Clone)]
pub struct OsSleep {
    address: u16,
    time: u16,
    control: u8,
}

impl OsSleep {
    /// Sleep for whole seconds; `control` flags per the OS peripheral
    /// documentation (wake-up on pin, calibration, LED flash).
    pub fn seconds(address: u16, seconds: u32, control: u8) -> Self {
        Self {
            address,
            time: (u64::from(seconds) * 1000 / 2097) as u16,
            control: control & 0x0F,
        }
    }

    /// Sleep for milliseconds; sets the millisecond-unit flag.
    pub fn millis(address: u16, millis: u32, control: u8) -> Self {
        Self {
            address,
            time: (u64::from(millis) * 1000 / 32_768) as u16,
            control: (control & 0x0F) | 0x10,
        }
    }

    pub fn wire_time(&self) -> u16 {
        self.time
    }
}

impl DpaTask for OsSleep {
    fn request(&self) -> Result<DpaFrame, DpaError> {
        let time = self.time.to_le_bytes();
        DpaFrame::request(
            self.address,
            PNUM_OS,
            CMD_OS_SLEEP,
            HWPID_DO_NOT_CHECK,
            &[time[0], time[1], self.control],
        )
    }

    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError> {
        if response.pnum() != PNUM_OS {
            return Err(DpaError::UnexpectedResponse);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_read_request() {
        let task = OsRead::new(0x0001);
        let request = task.request().unwrap();
        assert_eq!(request.as_bytes(), &[0x01, 0x00, 0x02, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_os_read_parses_module_info() {
        let mut task = OsRead::new(0x0001);
        // ModuleId 05.a4.00.81, OS version 0x42 -> "4.02D", McuType 0xB4:
        // series 76D, PIC16F1938, no FCC. Build 0x08C8.
        let response = DpaFrame::from_bytes(&[
            0x01, 0x00, 0x02, 0x80, 0xFF, 0xFF, 0x00, 0x00, 0x05, 0xA4, 0x00, 0x81, 0x42, 0xB4,
            0xC8, 0x08,
        ])
        .unwrap();
        task.parse_response(&response).unwrap();
        let info = task.module_info().unwrap();
        assert_eq!(info.module_id, "8100a405");
        assert_eq!(info.os_version, "4.02D");
        assert_eq!(info.tr_type, "DCTR-76D");
        assert_eq!(info.mcu_type, "PIC16F1938");
        assert!(!info.fcc_certified);
        assert_eq!(info.os_build, "08c8");
    }

    #[test]
    fn test_sleep_second_units() {
        // 10 s in 2.097 s units truncates to 4.
        let task = OsSleep::seconds(0x0001, 10, 0);
        assert_eq!(task.wire_time(), 4);
        let request = task.request().unwrap();
        assert_eq!(request.pdata(), &[0x04, 0x00, 0x00]);
    }

    #[test]
    fn test_sleep_millisecond_units_set_flag() {
        // 1000 ms in 32.768 ms units truncates to 30; flag 0x10 set.
        let task = OsSleep::millis(0x0001, 1000, 0x01);
        assert_eq!(task.wire_time(), 30);
        let request = task.request().unwrap();
        assert_eq!(request.pdata(), &[30, 0x00, 0x11]);
    }
}
