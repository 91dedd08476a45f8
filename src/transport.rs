//! Register transport layer.
//!
//! [`RegisterTransport`] is the seam between the driver and the wire: "read
//! `quantity` holding registers starting at `address`". The production
//! implementation, [`RtuTransport`], speaks MODBUS-RTU over a serial port;
//! tests substitute a mock.
//!
//! ## RTU framing
//!
//! A read request is a fixed 8-byte frame:
//!
//! ```text
//! unit(1) | function 0x03(1) | address(2, BE) | quantity(2, BE) | CRC-16(2, LE)
//! ```
//!
//! The response carries `unit | 0x03 | byte_count | 2*quantity data bytes |
//! CRC`, or an exception frame `unit | 0x83 | code | CRC`. End of frame is
//! detected by the 3.5-character silent interval mandated by the RTU spec.

use std::future::Future;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use crc::{Crc, CRC_16_MODBUS};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, trace, warn};

use crate::config::SpuConfig;
use crate::error::{SpuError, SpuResult};

/// Function code for Read Holding Registers.
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Maximum registers per read request (Modbus specification).
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum size of an RTU frame.
const MAX_RTU_FRAME_SIZE: usize = 256;

/// CRC calculator for RTU frames.
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Transport-level counters, cumulative over the transport's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// A connection capable of reading blocks of 16-bit holding registers.
///
/// The unit/slave address and serial parameters are fixed at construction;
/// callers only name the register range. All methods take `&mut self`: one
/// request is in flight at a time and concurrent callers must serialize
/// access externally.
pub trait RegisterTransport: Send {
    /// Open the underlying link, closing any previously open handle first.
    fn connect(&mut self) -> impl Future<Output = SpuResult<()>> + Send;

    /// Read `quantity` holding registers starting at `address`.
    ///
    /// Returns exactly `quantity` words on success; a response with any
    /// other count is an error, never a short success.
    fn read_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = SpuResult<Vec<u16>>> + Send;

    /// Whether the transport currently holds an open link.
    ///
    /// This is a local check; it does not probe the remote device.
    fn is_connected(&self) -> bool;

    /// Close the underlying link. Safe to call when already closed.
    fn close(&mut self) -> impl Future<Output = SpuResult<()>> + Send;

    /// Cumulative transport statistics.
    fn stats(&self) -> TransportStats;
}

/// Encode a Read Holding Registers request frame, CRC included.
pub(crate) fn encode_read_request(unit: u8, address: u16, quantity: u16) -> BytesMut {
    let mut frame = BytesMut::with_capacity(8);
    frame.put_u8(unit);
    frame.put_u8(FC_READ_HOLDING_REGISTERS);
    frame.put_u16(address);
    frame.put_u16(quantity);
    let crc = CRC_MODBUS.checksum(&frame);
    frame.put_u16_le(crc);
    frame
}

/// Decode a Read Holding Registers response frame into register words.
///
/// Validates CRC, unit address echo, function code and byte count against
/// the request, and surfaces device exception responses.
pub(crate) fn decode_read_response(
    frame: &[u8],
    unit: u8,
    quantity: u16,
) -> SpuResult<Vec<u16>> {
    if frame.len() < 5 {
        return Err(SpuError::frame(format!(
            "response frame too short: {} bytes",
            frame.len()
        )));
    }

    let data_len = frame.len() - 2;
    let received_crc = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
    let calculated_crc = CRC_MODBUS.checksum(&frame[..data_len]);
    if received_crc != calculated_crc {
        return Err(SpuError::frame(format!(
            "CRC mismatch: expected 0x{:04X}, got 0x{:04X}",
            calculated_crc, received_crc
        )));
    }

    if frame[0] != unit {
        return Err(SpuError::protocol(format!(
            "response unit address mismatch: expected {}, got {}",
            unit, frame[0]
        )));
    }

    let function = frame[1];
    if function & 0x80 != 0 {
        return Err(SpuError::Exception {
            function: function & 0x7F,
            code: frame[2],
        });
    }
    if function != FC_READ_HOLDING_REGISTERS {
        return Err(SpuError::protocol(format!(
            "unexpected function code 0x{:02X} in response",
            function
        )));
    }

    let byte_count = frame[2] as usize;
    let expected = quantity as usize * 2;
    if byte_count != expected {
        return Err(SpuError::invalid_data(format!(
            "expected {} data bytes for {} registers, response declares {}",
            expected, quantity, byte_count
        )));
    }
    if data_len - 3 != byte_count {
        return Err(SpuError::frame(format!(
            "response payload truncated: {} of {} data bytes",
            data_len - 3,
            byte_count
        )));
    }

    let registers = frame[3..3 + byte_count]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Ok(registers)
}

/// MODBUS-RTU transport over a serial port.
pub struct RtuTransport {
    /// Serial port handle; `None` while disconnected.
    port: Option<tokio_serial::SerialStream>,
    config: SpuConfig,
    /// Minimum silent interval between frames (3.5 character times).
    frame_gap: Duration,
    stats: TransportStats,
}

impl RtuTransport {
    /// Create a transport for the given configuration without opening the
    /// port. The first [`RegisterTransport::connect`] performs the open.
    pub fn new(config: SpuConfig) -> Self {
        // 11 bits per character on the wire (start + 8 data + parity/stop).
        let char_time_us = (11_000_000 / config.baud_rate.max(1)) as u64;
        let frame_gap = Duration::from_micros(char_time_us * 35 / 10);

        Self {
            port: None,
            config,
            frame_gap,
            stats: TransportStats::default(),
        }
    }

    /// Serial device path this transport talks to.
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Configuration this transport was built with.
    pub fn config(&self) -> &SpuConfig {
        &self.config
    }

    fn open_port(&mut self) -> SpuResult<()> {
        // Unit 0 is broadcast and 248-255 are reserved by the Modbus spec.
        if !(1..=247).contains(&self.config.unit_address) {
            return Err(SpuError::configuration(format!(
                "unit address {} outside the addressable range 1-247",
                self.config.unit_address
            )));
        }

        let builder = tokio_serial::new(&self.config.port_name, self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .stop_bits(self.config.stop_bits)
            .parity(self.config.parity)
            .timeout(self.config.timeout);

        let port = builder.open_native_async().map_err(|e| {
            SpuError::connection(format!(
                "failed to open serial port {}: {}",
                self.config.port_name, e
            ))
        })?;

        debug!(port = %self.config.port_name, baud = self.config.baud_rate, "serial port open");
        self.port = Some(port);
        Ok(())
    }

    /// Read one response frame, using the inter-frame gap as the end-of-frame
    /// marker. The caller bounds the total time with the response timeout.
    async fn read_frame(&mut self) -> SpuResult<Vec<u8>> {
        let frame_gap = self.frame_gap;
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SpuError::connection("serial port not open"))?;

        let mut frame = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match timeout(frame_gap, port.read_exact(&mut byte)).await {
                Ok(Ok(_)) => {
                    frame.push(byte[0]);
                    if frame.len() > MAX_RTU_FRAME_SIZE {
                        return Err(SpuError::frame("RTU frame too large"));
                    }
                }
                Ok(Err(e)) => {
                    return Err(SpuError::io(format!("serial read error: {}", e)));
                }
                Err(_) => {
                    // Silent interval: end of frame once data has arrived.
                    if !frame.is_empty() {
                        break;
                    }
                }
            }
        }

        Ok(frame)
    }
}

impl RegisterTransport for RtuTransport {
    async fn connect(&mut self) -> SpuResult<()> {
        if self.port.take().is_some() {
            debug!(port = %self.config.port_name, "closing serial port before reopen");
        }
        self.open_port()
    }

    async fn read_registers(&mut self, address: u16, quantity: u16) -> SpuResult<Vec<u16>> {
        if quantity == 0 || quantity > MAX_READ_REGISTERS {
            return Err(SpuError::invalid_data(format!(
                "invalid register quantity: {}",
                quantity
            )));
        }
        if self.port.is_none() {
            return Err(SpuError::connection("serial port not open"));
        }

        let timeout_ms = self.config.timeout.as_millis() as u64;
        let request = encode_read_request(self.config.unit_address, address, quantity);

        // Respect the inter-frame silent interval before transmitting.
        tokio::time::sleep(self.frame_gap).await;

        trace!(address, quantity, frame = ?&request[..], "sending read request");
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += request.len() as u64;

        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SpuError::connection("serial port not open"))?;

        match timeout(self.config.timeout, port.write_all(&request)).await {
            Ok(Ok(())) => {
                let _ = timeout(self.config.timeout, port.flush()).await;
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(SpuError::io(format!("failed to send request: {}", e)));
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(SpuError::timeout("send request", timeout_ms));
            }
        }

        let frame = match timeout(self.config.timeout, self.read_frame()).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(e);
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                warn!(address, quantity, timeout_ms, "no response from device");
                return Err(SpuError::timeout("read response", timeout_ms));
            }
        };

        self.stats.responses_received += 1;
        self.stats.bytes_received += frame.len() as u64;
        trace!(frame = ?frame, "received response frame");

        decode_read_response(&frame, self.config.unit_address, quantity).inspect_err(|_| {
            self.stats.errors += 1;
        })
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn close(&mut self) -> SpuResult<()> {
        if self.port.take().is_some() {
            debug!(port = %self.config.port_name, "serial port closed");
        }
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}
