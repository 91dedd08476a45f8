//! SPU status dump
//!
//! One-shot readout of the SPU's status flags and configured thresholds,
//! printed as a table. Uses the status-block bulk read for the flags and
//! per-field reads for the four thresholds.
//!
//! Usage: spu_status <serial_port> [timeout_ms]
//!
//! Exit codes: 1 on bad arguments, 2 if the initial connect fails,
//! 0 otherwise.

use std::env;
use std::process;
use std::time::Duration;

use spu_modbus::{FloatField, ReadStatus, SpuConfig, SpuRtuDriver, StatusField};

fn usage(program: &str) {
    eprintln!("usage: {} <serial_port> [timeout_ms]", program);
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("spu_status");

    let Some(port) = args.get(1) else {
        usage(program);
        process::exit(1);
    };
    let timeout_ms: u64 = match args.get(2).map(|s| s.parse()) {
        None => spu_modbus::DEFAULT_TIMEOUT_MS,
        Some(Ok(ms)) => ms,
        Some(Err(_)) => {
            usage(program);
            process::exit(1);
        }
    };

    let config = SpuConfig::new(port.as_str()).with_timeout(Duration::from_millis(timeout_ms));
    let mut driver = SpuRtuDriver::open(config);

    if let Err(e) = driver.connect().await {
        eprintln!("failed to connect to {}: {}", port, e);
        process::exit(2);
    }

    let snapshot = driver.read_status_flags().await;
    if snapshot.status != ReadStatus::Ok {
        eprintln!("status read failed: {}", snapshot.status);
    } else {
        println!("status flags of {}:", driver.port_name());
        for field in StatusField::ALL {
            println!("  {:<16} {}", field.mnemonic(), snapshot.flag(field) as u8);
        }
    }

    println!("thresholds:");
    for field in [
        FloatField::EmrNThreshold,
        FloatField::WrnNThreshold,
        FloatField::EmrTThreshold,
        FloatField::WrnTThreshold,
    ] {
        match driver.read_float(field).await {
            Ok(value) => println!("  {:<16} {:.4}", field.mnemonic(), value),
            Err(e) => eprintln!("  {:<16} read failed: {}", field.mnemonic(), e),
        }
    }

    let _ = driver.close().await;
}
