//! SPU driver: connection lifecycle, batched reads, snapshot state.
//!
//! [`SpuDriver`] owns one [`RegisterTransport`] and the last-known
//! [`SpuSnapshot`]. Bulk read operations never fail at the call site: they
//! fold every outcome into the snapshot's [`ReadStatus`] and return the
//! snapshot by value, so a polling loop always sees a consistent combination
//! of old and newly-updated fields. Per-field reads bypass the snapshot and
//! report through [`SpuResult`] instead.
//!
//! The driver performs no retries and no automatic reconnects; the caller's
//! polling loop is the retry mechanism.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::codec::{decode_bool, decode_float32};
use crate::config::SpuConfig;
use crate::error::{SpuError, SpuResult};
use crate::registers::{
    FloatField, StatusField, FLOAT_BLOCK_REGISTERS, FLOAT_BLOCK_START, FLOAT_REGISTER_SPAN,
    STATUS_BLOCK_REGISTERS, STATUS_BLOCK_START,
};
use crate::transport::{RegisterTransport, RtuTransport, TransportStats};

/// Outcome of the most recent read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// No read has been attempted since construction.
    NotAttempted,
    /// The last read completed and the snapshot holds fresh values.
    Ok,
    /// The last read failed on an open connection; data fields hold the
    /// values from before the attempt.
    ReadFailed,
    /// No usable connection existed when the read was attempted.
    ConnectionFailed,
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadStatus::NotAttempted => "not attempted",
            ReadStatus::Ok => "ok",
            ReadStatus::ReadFailed => "read failed",
            ReadStatus::ConnectionFailed => "connection failed",
        };
        write!(f, "{}", s)
    }
}

/// Last-known view of every mapped SPU field.
///
/// Fields not touched by a given read operation keep their previous value;
/// `status` and `timestamp` tell the caller whether and when the rest was
/// refreshed. Callers receive copies, never references into the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpuSnapshot {
    /// Outcome of the most recent read operation.
    pub status: ReadStatus,
    /// Time of the most recent read attempt, successful or not.
    pub timestamp: Option<DateTime<Utc>>,

    /// N_DATA_FP: neutron count measurement.
    pub n_data_fp: f32,
    /// T_DATA_FP: temperature measurement.
    pub t_data_fp: f32,
    /// F1_DATA_FP: flux measurement, channel 1.
    pub f1_data_fp: f32,
    /// F2_DATA_FP: flux measurement, channel 2.
    pub f2_data_fp: f32,
    /// F3_DATA_FP: flux measurement, channel 3.
    pub f3_data_fp: f32,
    /// EMR_N_THRESHOLD: emergency threshold for N.
    pub emr_n_threshold: f32,
    /// WRN_N_THRESHOLD: warning threshold for N.
    pub wrn_n_threshold: f32,
    /// EMR_T_THRESHOLD: emergency threshold for T.
    pub emr_t_threshold: f32,
    /// WRN_T_THRESHOLD: warning threshold for T.
    pub wrn_t_threshold: f32,

    /// EMR_N: emergency condition on N.
    pub emr_n: bool,
    /// WRN_N: warning condition on N.
    pub wrn_n: bool,
    /// EMR_T: emergency condition on T.
    pub emr_t: bool,
    /// WRN_T: warning condition on T.
    pub wrn_t: bool,
    /// R1: relay 1 state.
    pub r1: bool,
    /// R2: relay 2 state.
    pub r2: bool,
    /// R3: relay 3 state.
    pub r3: bool,
    /// RDY: device ready.
    pub rdy: bool,
    /// TEST: test mode active.
    pub test: bool,
    /// Reserved status register at 0x006D.
    pub reserved: bool,
}

impl Default for SpuSnapshot {
    fn default() -> Self {
        Self {
            status: ReadStatus::NotAttempted,
            timestamp: None,
            n_data_fp: 0.0,
            t_data_fp: 0.0,
            f1_data_fp: 0.0,
            f2_data_fp: 0.0,
            f3_data_fp: 0.0,
            emr_n_threshold: 0.0,
            wrn_n_threshold: 0.0,
            emr_t_threshold: 0.0,
            wrn_t_threshold: 0.0,
            emr_n: false,
            wrn_n: false,
            emr_t: false,
            wrn_t: false,
            r1: false,
            r2: false,
            r3: false,
            rdy: false,
            test: false,
            reserved: false,
        }
    }
}

impl SpuSnapshot {
    /// Value of a float field by register-map identity.
    pub fn float(&self, field: FloatField) -> f32 {
        match field {
            FloatField::NDataFp => self.n_data_fp,
            FloatField::TDataFp => self.t_data_fp,
            FloatField::F1DataFp => self.f1_data_fp,
            FloatField::F2DataFp => self.f2_data_fp,
            FloatField::F3DataFp => self.f3_data_fp,
            FloatField::EmrNThreshold => self.emr_n_threshold,
            FloatField::WrnNThreshold => self.wrn_n_threshold,
            FloatField::EmrTThreshold => self.emr_t_threshold,
            FloatField::WrnTThreshold => self.wrn_t_threshold,
        }
    }

    /// Value of a status flag by register-map identity.
    pub fn flag(&self, field: StatusField) -> bool {
        match field {
            StatusField::EmrN => self.emr_n,
            StatusField::WrnN => self.wrn_n,
            StatusField::EmrT => self.emr_t,
            StatusField::WrnT => self.wrn_t,
            StatusField::R1 => self.r1,
            StatusField::R2 => self.r2,
            StatusField::R3 => self.r3,
            StatusField::Rdy => self.rdy,
            StatusField::Test => self.test,
            StatusField::Reserved => self.reserved,
        }
    }
}

/// Driver for one SPU on one serial link.
///
/// Generic over the transport so tests can substitute a mock; production
/// code uses [`SpuRtuDriver`].
///
/// Not designed for concurrent use: the transport handle and the snapshot
/// are exclusively owned mutable state, so a single polling loop should own
/// the driver.
pub struct SpuDriver<T: RegisterTransport> {
    transport: T,
    snapshot: SpuSnapshot,
}

/// Driver over the production MODBUS-RTU transport.
pub type SpuRtuDriver = SpuDriver<RtuTransport>;

impl SpuDriver<RtuTransport> {
    /// Create a driver for an SPU on the given configuration.
    ///
    /// Performs no I/O; the device may be absent at this point. Call
    /// [`SpuDriver::connect`] before reading — until it succeeds, every
    /// bulk read reports [`ReadStatus::ConnectionFailed`].
    pub fn open(config: SpuConfig) -> Self {
        Self::new(RtuTransport::new(config))
    }

    /// Serial device path this driver polls.
    pub fn port_name(&self) -> &str {
        self.transport().port_name()
    }
}

impl<T: RegisterTransport> SpuDriver<T> {
    /// Create a driver over an already-constructed transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            snapshot: SpuSnapshot::default(),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open the connection, closing any previously open handle first.
    ///
    /// Safe to call repeatedly. On failure the driver stays disconnected
    /// and subsequent reads report [`ReadStatus::ConnectionFailed`] without
    /// attempting I/O; the snapshot's status is not changed by this call.
    pub async fn connect(&mut self) -> SpuResult<()> {
        self.transport
            .connect()
            .await
            .inspect_err(|e| warn!(error = %e, "connect failed"))
    }

    /// Close the connection. The driver stays usable; a later
    /// [`SpuDriver::connect`] reopens it.
    pub async fn close(&mut self) -> SpuResult<()> {
        self.transport.close().await
    }

    /// Whether the driver currently holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Copy of the current snapshot without performing I/O.
    pub fn snapshot(&self) -> SpuSnapshot {
        self.snapshot
    }

    /// Cumulative transport statistics.
    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Read every mapped field: the float block and the status block, in two
    /// register-range requests. Commits nothing unless both succeed.
    pub async fn read_all(&mut self) -> SpuSnapshot {
        if !self.transport.is_connected() {
            return self.finish(ReadStatus::ConnectionFailed);
        }

        let floats = match self.fetch(FLOAT_BLOCK_START, FLOAT_BLOCK_REGISTERS).await {
            Ok(regs) => regs,
            Err(_) => return self.finish(ReadStatus::ReadFailed),
        };
        let flags = match self.fetch(STATUS_BLOCK_START, STATUS_BLOCK_REGISTERS).await {
            Ok(regs) => regs,
            Err(_) => return self.finish(ReadStatus::ReadFailed),
        };

        self.apply_floats(&floats, 0);
        self.apply_flags(&flags);
        self.finish(ReadStatus::Ok)
    }

    /// Read N_DATA_FP and T_DATA_FP (registers 0x0001–0x0004).
    pub async fn read_temperature_count(&mut self) -> SpuSnapshot {
        if !self.transport.is_connected() {
            return self.finish(ReadStatus::ConnectionFailed);
        }

        match self.fetch(FLOAT_BLOCK_START, 2 * FLOAT_REGISTER_SPAN).await {
            Ok(regs) => {
                self.snapshot.n_data_fp = decode_float32(pair(&regs, 0));
                self.snapshot.t_data_fp = decode_float32(pair(&regs, 1));
                self.finish(ReadStatus::Ok)
            }
            Err(_) => self.finish(ReadStatus::ReadFailed),
        }
    }

    /// Read N_DATA_FP, T_DATA_FP and the three flux channels
    /// (registers 0x0001–0x000A).
    pub async fn read_temperature_count_flux(&mut self) -> SpuSnapshot {
        if !self.transport.is_connected() {
            return self.finish(ReadStatus::ConnectionFailed);
        }

        match self.fetch(FLOAT_BLOCK_START, 5 * FLOAT_REGISTER_SPAN).await {
            Ok(regs) => {
                self.apply_floats(&regs, 0);
                self.finish(ReadStatus::Ok)
            }
            Err(_) => self.finish(ReadStatus::ReadFailed),
        }
    }

    /// Read only the three flux channels (registers 0x0005–0x000A).
    pub async fn read_flux_only(&mut self) -> SpuSnapshot {
        if !self.transport.is_connected() {
            return self.finish(ReadStatus::ConnectionFailed);
        }

        let start = FloatField::F1DataFp.address();
        match self.fetch(start, 3 * FLOAT_REGISTER_SPAN).await {
            Ok(regs) => {
                self.apply_floats(&regs, FloatField::F1DataFp.block_index());
                self.finish(ReadStatus::Ok)
            }
            Err(_) => self.finish(ReadStatus::ReadFailed),
        }
    }

    /// Read all ten status flags (registers 0x0064–0x006D).
    pub async fn read_status_flags(&mut self) -> SpuSnapshot {
        if !self.transport.is_connected() {
            return self.finish(ReadStatus::ConnectionFailed);
        }

        match self.fetch(STATUS_BLOCK_START, STATUS_BLOCK_REGISTERS).await {
            Ok(regs) => {
                self.apply_flags(&regs);
                self.finish(ReadStatus::Ok)
            }
            Err(_) => self.finish(ReadStatus::ReadFailed),
        }
    }

    /// Read a single float field, bypassing the snapshot.
    ///
    /// Exists for lightweight polling of one quantity; neither the snapshot's
    /// data fields nor its status/timestamp are touched.
    pub async fn read_float(&mut self, field: FloatField) -> SpuResult<f32> {
        if !self.transport.is_connected() {
            return Err(SpuError::connection("not connected"));
        }
        let regs = self
            .transport
            .read_registers(field.address(), FLOAT_REGISTER_SPAN)
            .await?;
        if regs.len() != FLOAT_REGISTER_SPAN as usize {
            return Err(short_read(field.address(), FLOAT_REGISTER_SPAN, regs.len()));
        }
        Ok(decode_float32([regs[0], regs[1]]))
    }

    /// Read a single status flag, bypassing the snapshot.
    pub async fn read_status(&mut self, field: StatusField) -> SpuResult<bool> {
        if !self.transport.is_connected() {
            return Err(SpuError::connection("not connected"));
        }
        let regs = self.transport.read_registers(field.address(), 1).await?;
        if regs.len() != 1 {
            return Err(short_read(field.address(), 1, regs.len()));
        }
        Ok(decode_bool(regs[0]))
    }

    /// Read a register range, requiring the full count back.
    async fn fetch(&mut self, address: u16, quantity: u16) -> SpuResult<Vec<u16>> {
        let result = match self.transport.read_registers(address, quantity).await {
            Ok(regs) if regs.len() == quantity as usize => Ok(regs),
            Ok(regs) => Err(short_read(address, quantity, regs.len())),
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!(address, quantity, error = %e, "register read failed");
        }
        result
    }

    /// Decode float register pairs into the snapshot, starting at the given
    /// index within the float block.
    fn apply_floats(&mut self, regs: &[u16], first_index: usize) {
        for i in 0..regs.len() / 2 {
            let value = decode_float32(pair(regs, i));
            match FloatField::ALL[first_index + i] {
                FloatField::NDataFp => self.snapshot.n_data_fp = value,
                FloatField::TDataFp => self.snapshot.t_data_fp = value,
                FloatField::F1DataFp => self.snapshot.f1_data_fp = value,
                FloatField::F2DataFp => self.snapshot.f2_data_fp = value,
                FloatField::F3DataFp => self.snapshot.f3_data_fp = value,
                FloatField::EmrNThreshold => self.snapshot.emr_n_threshold = value,
                FloatField::WrnNThreshold => self.snapshot.wrn_n_threshold = value,
                FloatField::EmrTThreshold => self.snapshot.emr_t_threshold = value,
                FloatField::WrnTThreshold => self.snapshot.wrn_t_threshold = value,
            }
        }
    }

    /// Decode the full status block into the snapshot.
    fn apply_flags(&mut self, regs: &[u16]) {
        self.snapshot.emr_n = decode_bool(regs[0]);
        self.snapshot.wrn_n = decode_bool(regs[1]);
        self.snapshot.emr_t = decode_bool(regs[2]);
        self.snapshot.wrn_t = decode_bool(regs[3]);
        self.snapshot.r1 = decode_bool(regs[4]);
        self.snapshot.r2 = decode_bool(regs[5]);
        self.snapshot.r3 = decode_bool(regs[6]);
        self.snapshot.rdy = decode_bool(regs[7]);
        self.snapshot.test = decode_bool(regs[8]);
        self.snapshot.reserved = decode_bool(regs[9]);
    }

    /// Stamp the outcome of a read attempt and return the snapshot copy.
    fn finish(&mut self, status: ReadStatus) -> SpuSnapshot {
        if status != ReadStatus::Ok {
            debug!(status = %status, "read finished without fresh data");
        }
        self.snapshot.status = status;
        self.snapshot.timestamp = Some(Utc::now());
        self.snapshot
    }
}

/// Register pair `i` of a block slice, in address order.
#[inline]
fn pair(regs: &[u16], i: usize) -> [u16; 2] {
    [regs[2 * i], regs[2 * i + 1]]
}

fn short_read(address: u16, expected: u16, got: usize) -> SpuError {
    SpuError::invalid_data(format!(
        "expected {} registers from 0x{:04X}, got {}",
        expected, address, got
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_float32;
    use std::collections::VecDeque;

    /// Scripted transport: hands out queued responses and records every
    /// register-range request.
    struct MockTransport {
        requests: Vec<(u16, u16)>,
        responses: VecDeque<SpuResult<Vec<u16>>>,
        connected: bool,
        fail_connect: bool,
        connect_calls: u32,
        close_calls: u32,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                requests: Vec::new(),
                responses: VecDeque::new(),
                connected: true,
                fail_connect: false,
                connect_calls: 0,
                close_calls: 0,
            }
        }

        fn disconnected() -> Self {
            Self {
                connected: false,
                ..Self::new()
            }
        }

        fn push(&mut self, response: SpuResult<Vec<u16>>) {
            self.responses.push_back(response);
        }
    }

    impl RegisterTransport for MockTransport {
        async fn connect(&mut self) -> SpuResult<()> {
            self.connect_calls += 1;
            if self.connected {
                self.close_calls += 1;
                self.connected = false;
            }
            if self.fail_connect {
                return Err(SpuError::connection("no such device"));
            }
            self.connected = true;
            Ok(())
        }

        async fn read_registers(&mut self, address: u16, quantity: u16) -> SpuResult<Vec<u16>> {
            self.requests.push((address, quantity));
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err(SpuError::io("no scripted response")))
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn close(&mut self) -> SpuResult<()> {
            self.close_calls += 1;
            self.connected = false;
            Ok(())
        }

        fn stats(&self) -> TransportStats {
            TransportStats::default()
        }
    }

    /// Float block from the device manual's worked example:
    /// N_DATA_FP = 1.0, every other float zero.
    fn reference_float_block() -> Vec<u16> {
        let mut regs = vec![0u16; 18];
        regs[0] = 0x0000;
        regs[1] = 0x3F80;
        regs
    }

    /// Status block with EMR_N, EMR_T and RDY set.
    fn reference_status_block() -> Vec<u16> {
        vec![1, 0, 1, 0, 0, 0, 0, 1, 0, 0]
    }

    #[tokio::test]
    async fn test_read_all_decodes_reference_blocks() {
        let mut mock = MockTransport::new();
        mock.push(Ok(reference_float_block()));
        mock.push(Ok(reference_status_block()));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_all().await;

        assert_eq!(snap.status, ReadStatus::Ok);
        assert!(snap.timestamp.is_some());
        assert_eq!(snap.n_data_fp, 1.0);
        assert_eq!(snap.t_data_fp, 0.0);
        assert_eq!(snap.f1_data_fp, 0.0);
        assert_eq!(snap.wrn_t_threshold, 0.0);
        assert!(snap.emr_n);
        assert!(!snap.wrn_n);
        assert!(snap.emr_t);
        assert!(!snap.wrn_t);
        assert!(!snap.r1 && !snap.r2 && !snap.r3);
        assert!(snap.rdy);
        assert!(!snap.test);
        assert!(!snap.reserved);

        // Two range requests: the float block, then the status block.
        assert_eq!(
            driver.transport().requests,
            vec![(0x0001, 18), (0x0064, 10)]
        );
    }

    #[tokio::test]
    async fn test_read_while_disconnected_is_a_data_noop() {
        let mut driver = SpuDriver::new(MockTransport::disconnected());
        let before = driver.snapshot();

        let snap = driver.read_all().await;

        assert_eq!(snap.status, ReadStatus::ConnectionFailed);
        assert!(snap.timestamp.is_some());
        assert_eq!(snap.n_data_fp, before.n_data_fp);
        assert_eq!(snap.rdy, before.rdy);
        // No I/O was attempted.
        assert!(driver.transport().requests.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_preserves_fields_and_stamps_time() {
        let mut mock = MockTransport::new();
        mock.push(Ok(reference_float_block()));
        mock.push(Ok(reference_status_block()));
        let mut driver = SpuDriver::new(mock);
        driver.read_all().await;

        driver.transport_mut().push(Err(SpuError::timeout("read response", 1000)));
        let snap = driver.read_all().await;

        assert_eq!(snap.status, ReadStatus::ReadFailed);
        assert_eq!(snap.n_data_fp, 1.0);
        assert!(snap.emr_n);
    }

    #[tokio::test]
    async fn test_read_all_commits_nothing_on_second_range_failure() {
        let mut mock = MockTransport::new();
        // Float block would decode N = 2.0, but the status range fails.
        let mut floats = vec![0u16; 18];
        let two = encode_float32(2.0);
        floats[0] = two[0];
        floats[1] = two[1];
        mock.push(Ok(floats));
        mock.push(Err(SpuError::io("bus noise")));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_all().await;

        assert_eq!(snap.status, ReadStatus::ReadFailed);
        assert_eq!(snap.n_data_fp, 0.0, "float block must not be committed");
    }

    #[tokio::test]
    async fn test_short_response_is_read_failed() {
        let mut mock = MockTransport::new();
        mock.push(Ok(vec![0x0000, 0x3F80, 0x0000])); // 3 of 4 registers
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_temperature_count().await;

        assert_eq!(snap.status, ReadStatus::ReadFailed);
        assert_eq!(snap.n_data_fp, 0.0);
    }

    #[tokio::test]
    async fn test_read_temperature_count_updates_only_nt() {
        let mut mock = MockTransport::new();
        mock.push(Ok(reference_float_block()));
        mock.push(Ok(reference_status_block()));
        let mut driver = SpuDriver::new(mock);
        driver.read_all().await;

        // Narrower read: N = 3.0, T = 4.0.
        let mut regs = Vec::new();
        regs.extend_from_slice(&encode_float32(3.0));
        regs.extend_from_slice(&encode_float32(4.0));
        driver.transport_mut().push(Ok(regs));

        let snap = driver.read_temperature_count().await;

        assert_eq!(snap.status, ReadStatus::Ok);
        assert_eq!(snap.n_data_fp, 3.0);
        assert_eq!(snap.t_data_fp, 4.0);
        // Everything else keeps its prior value.
        assert_eq!(snap.f1_data_fp, 0.0);
        assert!(snap.emr_n);
        assert!(snap.rdy);
        assert_eq!(driver.transport().requests.last(), Some(&(0x0001, 4)));
    }

    #[tokio::test]
    async fn test_read_temperature_count_flux_window() {
        let mut mock = MockTransport::new();
        let mut regs = Vec::new();
        for value in [1.0f32, 2.0, 3.0, 4.0, 5.0] {
            regs.extend_from_slice(&encode_float32(value));
        }
        mock.push(Ok(regs));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_temperature_count_flux().await;

        assert_eq!(snap.status, ReadStatus::Ok);
        assert_eq!(snap.n_data_fp, 1.0);
        assert_eq!(snap.t_data_fp, 2.0);
        assert_eq!(snap.f1_data_fp, 3.0);
        assert_eq!(snap.f2_data_fp, 4.0);
        assert_eq!(snap.f3_data_fp, 5.0);
        assert_eq!(snap.emr_n_threshold, 0.0);
        assert_eq!(driver.transport().requests, vec![(0x0001, 10)]);
    }

    #[tokio::test]
    async fn test_read_flux_only_window() {
        let mut mock = MockTransport::new();
        let mut regs = Vec::new();
        for value in [7.0f32, 8.0, 9.0] {
            regs.extend_from_slice(&encode_float32(value));
        }
        mock.push(Ok(regs));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_flux_only().await;

        assert_eq!(snap.status, ReadStatus::Ok);
        assert_eq!(snap.f1_data_fp, 7.0);
        assert_eq!(snap.f2_data_fp, 8.0);
        assert_eq!(snap.f3_data_fp, 9.0);
        assert_eq!(snap.n_data_fp, 0.0, "N must not be touched by a flux read");
        assert_eq!(driver.transport().requests, vec![(0x0005, 6)]);
    }

    #[tokio::test]
    async fn test_read_status_flags_only_touches_flags() {
        let mut mock = MockTransport::new();
        mock.push(Ok(vec![0, 0xFFFF, 0, 0, 1, 0, 0, 0, 2, 0]));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_status_flags().await;

        assert_eq!(snap.status, ReadStatus::Ok);
        assert!(!snap.emr_n);
        assert!(snap.wrn_n, "0xFFFF is truthy");
        assert!(snap.r1);
        assert!(snap.test, "any non-zero word is truthy");
        assert_eq!(snap.n_data_fp, 0.0);
        assert_eq!(driver.transport().requests, vec![(0x0064, 10)]);
    }

    #[tokio::test]
    async fn test_read_float_bypasses_snapshot() {
        let mut mock = MockTransport::new();
        mock.push(Ok(encode_float32(42.5).to_vec()));
        let mut driver = SpuDriver::new(mock);

        let value = driver.read_float(FloatField::F1DataFp).await.unwrap();

        assert_eq!(value, 42.5);
        // The snapshot is untouched: no status change, no timestamp, no data.
        let snap = driver.snapshot();
        assert_eq!(snap.status, ReadStatus::NotAttempted);
        assert!(snap.timestamp.is_none());
        assert_eq!(snap.f1_data_fp, 0.0);
        assert_eq!(driver.transport().requests, vec![(0x0005, 2)]);
    }

    #[tokio::test]
    async fn test_read_status_single_flag() {
        let mut mock = MockTransport::new();
        mock.push(Ok(vec![1]));
        let mut driver = SpuDriver::new(mock);

        assert!(driver.read_status(StatusField::Rdy).await.unwrap());
        assert_eq!(driver.transport().requests, vec![(0x006B, 1)]);
        assert_eq!(driver.snapshot().status, ReadStatus::NotAttempted);
    }

    #[tokio::test]
    async fn test_single_field_read_requires_connection() {
        let mut driver = SpuDriver::new(MockTransport::disconnected());

        let err = driver.read_float(FloatField::NDataFp).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(driver.transport().requests.is_empty());
    }

    #[tokio::test]
    async fn test_connect_twice_closes_before_reopen() {
        let mut driver = SpuDriver::new(MockTransport::disconnected());

        driver.connect().await.unwrap();
        assert!(driver.is_connected());
        driver.connect().await.unwrap();

        assert!(driver.is_connected());
        assert_eq!(driver.transport().connect_calls, 2);
        // The second connect released the first handle before reopening.
        assert_eq!(driver.transport().close_calls, 1);
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_driver_disconnected() {
        let mut mock = MockTransport::disconnected();
        mock.fail_connect = true;
        let mut driver = SpuDriver::new(mock);

        assert!(driver.connect().await.is_err());
        assert!(!driver.is_connected());

        let snap = driver.read_all().await;
        assert_eq!(snap.status, ReadStatus::ConnectionFailed);
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_not_attempted() {
        let driver = SpuDriver::new(MockTransport::new());
        let snap = driver.snapshot();
        assert_eq!(snap.status, ReadStatus::NotAttempted);
        assert!(snap.timestamp.is_none());
        assert_eq!(snap.float(FloatField::NDataFp), 0.0);
        assert!(!snap.flag(StatusField::Rdy));
    }

    #[tokio::test]
    async fn test_snapshot_field_accessors() {
        let mut mock = MockTransport::new();
        mock.push(Ok(reference_float_block()));
        mock.push(Ok(reference_status_block()));
        let mut driver = SpuDriver::new(mock);

        let snap = driver.read_all().await;

        assert_eq!(snap.float(FloatField::NDataFp), 1.0);
        assert_eq!(snap.float(FloatField::EmrTThreshold), 0.0);
        assert!(snap.flag(StatusField::EmrN));
        assert!(!snap.flag(StatusField::Test));
    }
}
