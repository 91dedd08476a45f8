//! SPU polling demo
//!
//! Connects to an SPU on the given serial port and repeatedly reads the
//! full register map, printing one line per iteration.
//!
//! Usage: spu_poll <serial_port> [timeout_ms] [read_count]
//! Example: spu_poll /dev/ttyUSB0 1000 10
//!
//! Exit codes: 1 on bad arguments, 2 if the initial connect fails,
//! 0 otherwise.

use std::env;
use std::process;
use std::time::Duration;

use spu_modbus::{ReadStatus, SpuConfig, SpuRtuDriver};
use tokio::time::sleep;

const DEFAULT_READ_COUNT: u32 = 10;

fn usage(program: &str) {
    eprintln!("usage: {} <serial_port> [timeout_ms] [read_count]", program);
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("spu_poll");

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
    let read_count: u32 = match args.get(3).map(|s| s.parse()) {
        None => DEFAULT_READ_COUNT,
        Some(Ok(n)) => n,
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
    println!("connected to {}", driver.port_name());

    for i in 0..read_count {
        let snapshot = driver.read_all().await;
        let stamp = snapshot
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "-".to_string());

        match snapshot.status {
            ReadStatus::Ok => {
                println!(
                    "[{}] N={:<12.4} T={:<12.4} F1={:<12.4} F2={:<12.4} F3={:<12.4} \
                     EMR_N={} WRN_N={} EMR_T={} WRN_T={} RDY={}",
                    stamp,
                    snapshot.n_data_fp,
                    snapshot.t_data_fp,
                    snapshot.f1_data_fp,
                    snapshot.f2_data_fp,
                    snapshot.f3_data_fp,
                    snapshot.emr_n as u8,
                    snapshot.wrn_n as u8,
                    snapshot.emr_t as u8,
                    snapshot.wrn_t as u8,
                    snapshot.rdy as u8,
                );
            }
            status => {
                eprintln!("[{}] read {} of {}: {}", stamp, i + 1, read_count, status);
            }
        }

        if i + 1 < read_count {
            sleep(Duration::from_millis(500)).await;
        }
    }

    let stats = driver.stats();
    println!(
        "done: {} requests, {} responses, {} errors, {} timeouts",
        stats.requests_sent, stats.responses_received, stats.errors, stats.timeouts
    );

    let _ = driver.close().await;
}
