//! Command UART receive task
//!
//! Assembles lines from the host UART and queues typed commands for the
//! control loop.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use phasetherm_protocol::{Command, LineBuffer};

use crate::channels::COMMANDS;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 32;

#[embassy_executor::task]
pub async fn command_rx_task(mut rx: BufferedUartRx) {
    info!("Command RX task started");

    let mut lines = LineBuffer::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for &byte in &buf[..n] {
                    match lines.feed(byte) {
                        Ok(Some(line)) => {
                            let parsed = Command::parse(&line);
                            debug!("Command line {=str}: {}", line.as_str(), parsed);
                            // Drop rather than block the UART when the loop is behind
                            if COMMANDS.try_send(parsed).is_err() {
                                warn!("Command channel full, dropping line");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Line error: {}", e);
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {}", e);
            }
        }
    }
}
