//! Zero-cross edge task
//!
//! Counts detector edges and wakes the control loop. Edge timing and
//! pulse scheduling happen in the control loop against the system timer.

use defmt::*;
use embassy_rp::gpio::Input;

use phasetherm_hal_rp2040::count_edges;

use crate::channels::{EDGES, ZERO_CROSS};

#[embassy_executor::task]
pub async fn zero_cross_task(mut pin: Input<'static>) {
    info!("Zero-cross task started");

    let never = count_edges(&mut pin, &EDGES, || ZERO_CROSS.signal(())).await;
    match never {}
}
