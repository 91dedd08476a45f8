//! Driver configuration.
//!
//! The SPU speaks MODBUS-RTU with fixed serial parameters; only the port
//! name and the response timeout vary between installations. The builder
//! methods exist for bench setups that run the device behind converters
//! with different settings.

use std::time::Duration;

use tokio_serial::{DataBits, Parity, StopBits};

/// Baud rate used by the SPU.
pub const SPU_BAUD_RATE: u32 = 57_600;

/// MODBUS unit/slave address of the SPU on the bus.
pub const SPU_UNIT_ADDRESS: u8 = 0x01;

/// Default response timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Serial and protocol configuration for one SPU connection.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use spu_modbus::SpuConfig;
///
/// let config = SpuConfig::new("/dev/ttyUSB0").with_timeout(Duration::from_millis(500));
/// assert_eq!(config.baud_rate, 57_600);
/// assert_eq!(config.unit_address, 1);
/// ```
#[derive(Debug, Clone)]
pub struct SpuConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port_name: String,
    /// Baud rate (57600 for the SPU).
    pub baud_rate: u32,
    /// Data bits (8 for the SPU).
    pub data_bits: DataBits,
    /// Stop bits (1 for the SPU).
    pub stop_bits: StopBits,
    /// Parity (none for the SPU).
    pub parity: Parity,
    /// MODBUS unit/slave address (1 for the SPU).
    pub unit_address: u8,
    /// Per-request response timeout.
    pub timeout: Duration,
}

impl SpuConfig {
    /// Configuration for an SPU on the given serial port, with the fixed
    /// device parameters (57600 baud, 8 data bits, no parity, 1 stop bit,
    /// unit address 1).
    pub fn new<S: Into<String>>(port_name: S) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: SPU_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            unit_address: SPU_UNIT_ADDRESS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Set the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the unit/slave address.
    pub fn with_unit_address(mut self, unit_address: u8) -> Self {
        self.unit_address = unit_address;
        self
    }
}
