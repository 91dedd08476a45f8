//! Error types for SPU driver operations.
//!
//! All fallible operations in this crate return [`SpuResult`]. The error
//! taxonomy distinguishes connection-level failures (no usable serial link)
//! from read-level failures (an open link that did not produce a valid
//! response), because the driver treats them differently: a failed read does
//! not tear down the connection, while a failed connect leaves the driver
//! disconnected until the next explicit `connect()`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SpuResult<T> = Result<T, SpuError>;

/// Errors produced by the transport and driver layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpuError {
    /// The serial link could not be opened, or is not open.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// An operation did not complete within the configured timeout.
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Underlying serial I/O failure.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Malformed RTU frame: too short, too long, or CRC mismatch.
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Well-formed frame that violates the protocol contract,
    /// e.g. a response from the wrong unit address.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The device answered with a Modbus exception response.
    #[error("Device exception for function 0x{function:02X}: {} (0x{code:02X})", exception_name(.code))]
    Exception { function: u8, code: u8 },

    /// Response contents do not match what was requested,
    /// e.g. a register count mismatch.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Invalid driver or serial configuration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl SpuError {
    /// Create a connection error.
    pub fn connection<S: Into<String>>(message: S) -> Self {
        SpuError::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        SpuError::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an I/O error.
    pub fn io<S: Into<String>>(message: S) -> Self {
        SpuError::Io {
            message: message.into(),
        }
    }

    /// Create a frame error.
    pub fn frame<S: Into<String>>(message: S) -> Self {
        SpuError::Frame {
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        SpuError::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        SpuError::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        SpuError::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error indicates the connection itself is unusable,
    /// as opposed to a single failed request on a usable connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, SpuError::Connection { .. })
    }
}

/// Human-readable name for a Modbus exception code.
fn exception_name(code: &u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Failed To Respond",
        _ => "Unknown Exception",
    }
}
