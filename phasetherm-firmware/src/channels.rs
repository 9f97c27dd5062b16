//! Inter-task communication
//!
//! Statics shared between the edge task, the UART task and the control
//! loop. Uses embassy-sync primitives guarded by a critical section.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use phasetherm_core::traits::CommandChannel;
use phasetherm_hal_rp2040::EdgeCounter;
use phasetherm_protocol::{Command, ParseError};

/// Channel capacity for parsed command lines
const COMMAND_CHANNEL_SIZE: usize = 4;

/// Parsed command lines from the UART, oldest first
///
/// Malformed lines are queued as errors so the control loop can journal them.
pub static COMMANDS: Channel<
    CriticalSectionRawMutex,
    Result<Command, ParseError>,
    COMMAND_CHANNEL_SIZE,
> = Channel::new();

/// Rising edges on the zero-cross detector
pub static EDGES: EdgeCounter = EdgeCounter::new();

/// Wakes the control loop on every zero-cross edge
pub static ZERO_CROSS: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Non-blocking view of [`COMMANDS`] for the command-intake task
pub struct QueuedCommands;

impl CommandChannel for QueuedCommands {
    fn try_receive(&mut self) -> Option<Result<Command, ParseError>> {
        COMMANDS.try_receive().ok()
    }
}
