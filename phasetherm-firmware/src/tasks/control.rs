//! Heater control loop
//!
//! Drives the supervisor: poll, then sleep until the next deadline or the
//! next zero-cross edge, whichever comes first. After a halt the loop waits
//! for an operator `HEATER_ON` before restarting into idle.

use defmt::*;
use embassy_futures::select::select;
use embassy_rp::gpio::Output;
use embassy_time::{Instant, Timer};

use phasetherm_drivers::heater::{EmbeddedPin, GateOutput};
use phasetherm_drivers::sensor::Ntc100kSensor;
use phasetherm_drivers::Supervisor;
use phasetherm_hal_rp2040::{ThermistorAdc, ZeroCrossClock};
use phasetherm_protocol::Command;

use crate::channels::{QueuedCommands, COMMANDS, ZERO_CROSS};
use crate::sink::DefmtSink;

/// Longest sleep when nothing is scheduled
const IDLE_WAKE_MS: u64 = 10;

/// Supervisor as wired on the board
pub type HeaterSupervisor = Supervisor<
    ZeroCrossClock<'static>,
    GateOutput<EmbeddedPin<Output<'static>>>,
    Ntc100kSensor<ThermistorAdc<'static>>,
    QueuedCommands,
    DefmtSink,
>;

#[embassy_executor::task]
pub async fn control_task(mut supervisor: HeaterSupervisor) {
    info!("Control task started");
    supervisor.start();

    loop {
        match supervisor.poll() {
            Ok(()) => sleep_until(supervisor.next_wake()).await,
            Err(fault) => {
                error!("Heater halted: {}", fault);
                wait_for_heater_on().await;
                if supervisor.restart() {
                    info!("Controller restarted, state {}", supervisor.state());
                }
            }
        }
    }
}

async fn sleep_until(wake_us: Option<u64>) {
    let timer = match wake_us {
        Some(at) => Timer::at(Instant::from_micros(at)),
        None => Timer::after_millis(IDLE_WAKE_MS),
    };
    select(timer, ZERO_CROSS.wait()).await;
}

/// Discard queued commands until the operator asks for the heater again
async fn wait_for_heater_on() {
    loop {
        match COMMANDS.receive().await {
            Ok(Command::HeaterOn) => return,
            other => warn!("Ignoring {} while halted", other),
        }
    }
}
