//! Zero-cross edge counting
//!
//! The opto-isolated detector output is wired to a GPIO. A dedicated task
//! awaits each rising edge and bumps an atomic counter; the control loop
//! reads the counter and the system timer through [`ZeroCrossClock`].

use embedded_hal_async::digital::Wait;
use portable_atomic::{AtomicU32, Ordering};

use phasetherm_hal::{Instant, Monotonic, ZeroCrossTimer};

/// Rising-edge counter shared between the edge task and the control loop
pub struct EdgeCounter {
    edges: AtomicU32,
}

impl Default for EdgeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeCounter {
    /// Create a counter at zero (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            edges: AtomicU32::new(0),
        }
    }

    /// Count one edge, wrapping at `u32::MAX`
    pub fn record_edge(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    /// Edges seen so far
    pub fn count(&self) -> u32 {
        self.edges.load(Ordering::Relaxed)
    }
}

/// System timer plus edge counter, as seen by the control loop
#[derive(Clone, Copy)]
pub struct ZeroCrossClock<'a> {
    edges: &'a EdgeCounter,
}

impl<'a> ZeroCrossClock<'a> {
    pub fn new(edges: &'a EdgeCounter) -> Self {
        Self { edges }
    }
}

impl Monotonic for ZeroCrossClock<'_> {
    fn now(&self) -> Instant {
        embassy_time::Instant::now().as_micros()
    }
}

impl ZeroCrossTimer for ZeroCrossClock<'_> {
    fn edge_count(&self) -> u32 {
        self.edges.count()
    }
}

/// Count rising edges on `pin` until the pin reports an error
///
/// `on_edge` runs after every counted edge; the firmware uses it to wake
/// the control loop.
pub async fn count_edges<P, F>(pin: &mut P, counter: &EdgeCounter, mut on_edge: F) -> P::Error
where
    P: Wait,
    F: FnMut(),
{
    loop {
        if let Err(e) = pin.wait_for_rising_edge().await {
            return e;
        }
        counter.record_edge();
        on_edge();
    }
}
