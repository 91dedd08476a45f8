//! # SPU Modbus - MODBUS-RTU Driver for the SystemAtom SPU
//!
//! A driver crate for polling the SystemAtom SPU measurement and protection
//! unit over MODBUS-RTU (RS-485), decoding its fixed register map into typed
//! engineering values.
//!
//! ## Features
//!
//! - **Fixed register map**: the SPU's float and status blocks, bit-exact
//! - **Pinned byte order**: word-swapped float32 decoding verified against
//!   device captures
//! - **Snapshot state**: every bulk read returns a consistent copy of the
//!   last-known values plus a read status and timestamp
//! - **Read-only by design**: no write operation exists in the driver
//! - **Testable core**: the transport sits behind a trait; the driver is
//!   exercised against a scripted mock
//!
//! ## Register Map
//!
//! | Registers | Contents |
//! |-----------|----------|
//! | 0x0001–0x0012 | 9 float32 measurements and thresholds, 2 registers each |
//! | 0x0064–0x006D | 10 status flags, 1 register each, non-zero = set |
//!
//! Serial parameters are fixed by the device: 57600 baud, 8 data bits, no
//! parity, 1 stop bit, unit address 1.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spu_modbus::{ReadStatus, SpuConfig, SpuRtuDriver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut driver = SpuRtuDriver::open(SpuConfig::new("/dev/ttyUSB0"));
//!
//!     if let Err(e) = driver.connect().await {
//!         eprintln!("connect failed: {}", e);
//!     }
//!
//!     // Poll; a failed iteration leaves the previous values in place.
//!     let snapshot = driver.read_all().await;
//!     if snapshot.status == ReadStatus::Ok {
//!         println!("N = {}, T = {}", snapshot.n_data_fp, snapshot.t_data_fp);
//!     }
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Byte order handling for multi-register data types
pub mod bytes;

/// Decoding of raw register words into engineering values
pub mod codec;

/// Fixed register map of the SPU
pub mod registers;

/// Serial and protocol configuration
pub mod config;

/// Register transport layer: trait, statistics, MODBUS-RTU implementation
pub mod transport;

/// Driver: connection lifecycle, batched reads, snapshot state
pub mod driver;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use spu_modbus::tokio) ===
pub use tokio;

// === Driver API ===
pub use driver::{ReadStatus, SpuDriver, SpuRtuDriver, SpuSnapshot};

// === Error handling ===
pub use error::{SpuError, SpuResult};

// === Core types ===
pub use bytes::ByteOrder;
pub use codec::{decode_bool, decode_float32, encode_float32, SPU_WORD_ORDER};
pub use config::{SpuConfig, DEFAULT_TIMEOUT_MS, SPU_BAUD_RATE, SPU_UNIT_ADDRESS};
pub use registers::{FloatField, StatusField};

// === Transport layer ===
pub use transport::{RegisterTransport, RtuTransport, TransportStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
