//! Protocol constants of the IQRF DPA specification.
//!
//! Names follow the published DPA Tech Guide so that request builders and
//! log output can be cross-checked against the document directly.

// --- Network addresses (NADR) ---

/// Address of the local coordinator module.
pub const COORDINATOR_ADDRESS: u16 = 0x00;
/// Address of the locally attached device (no RF involved).
pub const LOCAL_ADDRESS: u16 = 0xFC;
/// Temporary address of a node before a bond is finalized.
pub const TEMPORARY_ADDRESS: u16 = 0xFE;
/// Broadcast to all bonded nodes.
pub const BROADCAST_ADDRESS: u16 = 0xFF;
/// Highest address assignable to a regular bonded node (239).
pub const MAX_NODE_ADDRESS: u16 = 0xEF;

/// True when the address targets the local coordinator.
pub fn is_coordinator_address(nadr: u16) -> bool {
    nadr & BROADCAST_ADDRESS == COORDINATOR_ADDRESS
}

/// True when the address is the network broadcast.
pub fn is_broadcast_address(nadr: u16) -> bool {
    nadr & BROADCAST_ADDRESS == BROADCAST_ADDRESS
}

// --- Hardware profiles (HWPID) ---

/// Default hardware profile.
pub const HWPID_DEFAULT: u16 = 0x0000;
/// Wildcard profile, disables the HWPID check on the node.
pub const HWPID_DO_NOT_CHECK: u16 = 0xFFFF;

// --- Embedded peripheral numbers (PNUM) ---

pub const PNUM_COORDINATOR: u8 = 0x00;
pub const PNUM_NODE: u8 = 0x01;
pub const PNUM_OS: u8 = 0x02;
pub const PNUM_EEPROM: u8 = 0x03;
pub const PNUM_EEEPROM: u8 = 0x04;
pub const PNUM_RAM: u8 = 0x05;
pub const PNUM_LEDR: u8 = 0x06;
pub const PNUM_LEDG: u8 = 0x07;
pub const PNUM_SPI: u8 = 0x08;
pub const PNUM_IO: u8 = 0x09;
pub const PNUM_THERMOMETER: u8 = 0x0A;
pub const PNUM_UART: u8 = 0x0C;
pub const PNUM_FRC: u8 = 0x0D;
/// First user-defined peripheral.
pub const PNUM_USER: u8 = 0x20;
/// Flag peripheral number of an error DPA response.
pub const PNUM_ERROR_FLAG: u8 = 0xFE;
/// Peripheral enumeration pseudo-peripheral.
pub const PNUM_ENUMERATION: u8 = 0xFF;

// --- Peripheral commands (PCMD) ---

/// Bit 7 of PCMD distinguishes a response from a request.
pub const PCMD_RESPONSE_FLAG: u8 = 0x80;

// Coordinator peripheral
pub const CMD_COORDINATOR_ADDR_INFO: u8 = 0;
pub const CMD_COORDINATOR_DISCOVERED_DEVICES: u8 = 1;
pub const CMD_COORDINATOR_BONDED_DEVICES: u8 = 2;
pub const CMD_COORDINATOR_CLEAR_ALL_BONDS: u8 = 3;
pub const CMD_COORDINATOR_BOND_NODE: u8 = 4;
pub const CMD_COORDINATOR_REMOVE_BOND: u8 = 5;
pub const CMD_COORDINATOR_DISCOVERY: u8 = 7;
pub const CMD_COORDINATOR_SET_DPAPARAMS: u8 = 8;
pub const CMD_COORDINATOR_SET_HOPS: u8 = 9;
pub const CMD_COORDINATOR_BACKUP: u8 = 11;
pub const CMD_COORDINATOR_RESTORE: u8 = 12;
pub const CMD_COORDINATOR_AUTHORIZE_BOND: u8 = 13;
pub const CMD_COORDINATOR_BRIDGE: u8 = 14;
pub const CMD_COORDINATOR_SMART_CONNECT: u8 = 18;
pub const CMD_COORDINATOR_SET_MID: u8 = 19;

// Node peripheral
pub const CMD_NODE_READ: u8 = 0;
pub const CMD_NODE_REMOVE_BOND: u8 = 1;
pub const CMD_NODE_BACKUP: u8 = 6;
pub const CMD_NODE_RESTORE: u8 = 7;
pub const CMD_NODE_VALIDATE_BONDS: u8 = 8;

// OS peripheral
pub const CMD_OS_READ: u8 = 0;
pub const CMD_OS_RESET: u8 = 1;
pub const CMD_OS_READ_CFG: u8 = 2;
pub const CMD_OS_RFPGM: u8 = 3;
pub const CMD_OS_SLEEP: u8 = 4;
pub const CMD_OS_BATCH: u8 = 5;
pub const CMD_OS_SET_SECURITY: u8 = 6;
pub const CMD_OS_INDICATE: u8 = 7;
pub const CMD_OS_RESTART: u8 = 8;
pub const CMD_OS_WRITE_CFG_BYTE: u8 = 9;
pub const CMD_OS_LOAD_CODE: u8 = 10;
pub const CMD_OS_SELECTIVE_BATCH: u8 = 11;
pub const CMD_OS_TEST_RF_SIGNAL: u8 = 12;
pub const CMD_OS_FACTORY_SETTINGS: u8 = 13;
pub const CMD_OS_WRITE_CFG: u8 = 15;

// RAM / EEPROM peripherals
pub const CMD_RAM_READ: u8 = 0;
pub const CMD_RAM_WRITE: u8 = 1;
pub const CMD_EEPROM_READ: u8 = CMD_RAM_READ;
pub const CMD_EEPROM_WRITE: u8 = CMD_RAM_WRITE;

// LED peripherals (red and green share the command set)
pub const CMD_LED_SET_OFF: u8 = 0;
pub const CMD_LED_SET_ON: u8 = 1;
pub const CMD_LED_PULSE: u8 = 3;
pub const CMD_LED_FLASHING: u8 = 4;

// IO peripheral
pub const CMD_IO_DIRECTION: u8 = 0;
pub const CMD_IO_SET: u8 = 1;
pub const CMD_IO_GET: u8 = 2;

// Thermometer peripheral
pub const CMD_THERMOMETER_READ: u8 = 0;

// UART peripheral
pub const CMD_UART_OPEN: u8 = 0;
pub const CMD_UART_CLOSE: u8 = 1;
pub const CMD_UART_WRITE_READ: u8 = 2;
pub const CMD_UART_CLEAR_WRITE_READ: u8 = 3;

// FRC peripheral
pub const CMD_FRC_SEND: u8 = 0;
pub const CMD_FRC_EXTRARESULT: u8 = 1;
pub const CMD_FRC_SEND_SELECTIVE: u8 = 2;
pub const CMD_FRC_SET_PARAMS: u8 = 3;

/// Peripheral enumeration command (reserved PCMD value).
pub const CMD_GET_PER_INFO: u8 = 0x3F;

// --- DPA response status codes ---

pub const STATUS_NO_ERROR: u8 = 0;
pub const ERROR_FAIL: u8 = 1;
pub const ERROR_PCMD: u8 = 2;
pub const ERROR_PNUM: u8 = 3;
pub const ERROR_ADDR: u8 = 4;
pub const ERROR_DATA_LEN: u8 = 5;
pub const ERROR_DATA: u8 = 6;
pub const ERROR_HWPID: u8 = 7;
pub const ERROR_NADR: u8 = 8;
pub const ERROR_IFACE_CUSTOM_HANDLER: u8 = 9;
pub const ERROR_MISSING_CUSTOM_DPA_HANDLER: u8 = 10;
/// First status code reserved to custom DPA handlers.
pub const ERROR_USER_FROM: u8 = 0x20;
/// Last status code reserved to custom DPA handlers.
pub const ERROR_USER_TO: u8 = 0x3F;
/// Flag bit marking an asynchronous DPA response.
pub const STATUS_ASYNC_RESPONSE: u8 = 0x80;
/// Status code of a confirmation frame.
pub const STATUS_CONFIRMATION: u8 = 0xFF;
