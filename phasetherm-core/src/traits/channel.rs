//! Command channel trait

use phasetherm_protocol::{Command, ParseError};

/// Source of parsed heater commands
///
/// Lines are parsed at the channel boundary; the control core only sees
/// the result. A parse failure is delivered too, so it can be journaled.
pub trait CommandChannel {
    /// Take the next pending command without waiting
    fn try_receive(&mut self) -> Option<Result<Command, ParseError>>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn try_receive(&mut self) -> Option<Result<Command, ParseError>> {
        (**self).try_receive()
    }
}
