//! Phasetherm - AC phase-control heater firmware
//!
//! Main firmware binary for RP2040 boards. One triac gate is fired at a
//! phase delay after each mains zero crossing; the delay follows a PID
//! regulator fed by an NTC probe, with gains found by an on-board
//! Ziegler-Nichols auto-tune.
//!
//! Board wiring (SKR Pico headers):
//! - GPIO0/GPIO1: UART0 command console (115200 8N1)
//! - GPIO15: zero-cross detector output, one rising edge per mains cycle
//! - GPIO23: HE0, triac gate through an optocoupler (active high)
//! - GPIO27: TH0, NTC 100K with 4.7K pull-up

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use phasetherm_core::config::ControlConfig;
use phasetherm_drivers::heater::{EmbeddedPin, GateOutput};
use phasetherm_drivers::sensor::Ntc100kSensor;
use phasetherm_drivers::Supervisor;
use phasetherm_hal_rp2040::{ThermistorAdc, ZeroCrossClock};

use crate::channels::{QueuedCommands, EDGES};
use crate::sink::DefmtSink;

mod channels;
mod sink;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// Thermistor divider pull-up
const PULLUP_OHMS: u32 = 4700;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Phasetherm firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Gate first, so the triac is held off before anything else runs
    let gate = GateOutput::new_active_high(EmbeddedPin::new(Output::new(p.PIN_23, Level::Low)));

    let config = ControlConfig::default();
    info!(
        "Heater config: setpoint={}°C, max_duty={}%, max_temp={}°C",
        config.regulator.setpoint_c, config.phase.max_duty_cycle, config.safety.max_temperature_c
    );

    // Command console
    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (_tx, rx) = uart.split();
    info!("UART initialized for command intake");

    // Zero-cross detector (open-collector opto output)
    let zero_cross = Input::new(p.PIN_15, Pull::Up);

    // Vessel probe
    let adc = Adc::new_blocking(p.ADC, AdcConfig::default());
    let therm_channel = Channel::new_pin(p.PIN_27, Pull::None);
    let probe = Ntc100kSensor::new(ThermistorAdc::new(adc, therm_channel), PULLUP_OHMS);
    info!("ADC and heater gate initialized");

    let supervisor = match Supervisor::new(
        ZeroCrossClock::new(&EDGES),
        gate,
        probe,
        QueuedCommands,
        DefmtSink,
        config,
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            // Gate stays low; nothing else is started
            error!("Invalid control configuration: {}", e);
            loop {
                embassy_time::Timer::after_secs(60).await;
            }
        }
    };

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::zero_cross_task(zero_cross)));
    unwrap!(spawner.spawn(tasks::command_rx_task(rx)));
    unwrap!(spawner.spawn(tasks::control_task(supervisor)));

    info!("All tasks spawned, firmware running");
}
