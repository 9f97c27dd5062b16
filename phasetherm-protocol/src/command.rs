//! Heater commands and their wire encoding

use core::fmt;
use core::str::FromStr;

// Wire keywords
const KW_SET_TEMP: &str = "SET_HEATER_TEMP";
const KW_SET_DUTY: &str = "SET_HEATER_DUTY";
const KW_HEATER_ON: &str = "HEATER_ON";
const KW_HEATER_OFF: &str = "HEATER_OFF";

/// Argument separator
const SEPARATOR: char = ',';

/// Command accepted by the control core
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// New regulation setpoint in °C
    SetTemperature(f32),
    /// New duty-cycle ceiling in percent
    SetMaxDuty(u8),
    /// Enable firing
    HeaterOn,
    /// Disable firing from the next half-cycle
    HeaterOff,
}

/// Reasons a line is not a valid command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line was blank
    Empty,
    /// Keyword not recognised
    UnknownCommand,
    /// Keyword needs an argument but none was given
    MissingArgument,
    /// Argument could not be parsed or is not finite
    InvalidArgument,
    /// Keyword takes no argument but one was given
    UnexpectedArgument,
}

impl Command {
    /// Parse a single line (without its terminator)
    ///
    /// Leading and trailing whitespace is ignored, as is whitespace around
    /// the argument.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (keyword, argument) = match line.split_once(SEPARATOR) {
            Some((keyword, argument)) => (keyword.trim(), Some(argument.trim())),
            None => (line, None),
        };

        match keyword {
            KW_SET_TEMP => {
                let value: f32 = parse_argument(argument)?;
                if !value.is_finite() {
                    return Err(ParseError::InvalidArgument);
                }
                Ok(Command::SetTemperature(value))
            }
            KW_SET_DUTY => Ok(Command::SetMaxDuty(parse_argument(argument)?)),
            KW_HEATER_ON => no_argument(argument, Command::HeaterOn),
            KW_HEATER_OFF => no_argument(argument, Command::HeaterOff),
            _ => Err(ParseError::UnknownCommand),
        }
    }

    /// Write the wire form of this command (without terminator)
    pub fn write_to<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Command::SetTemperature(value) => write!(out, "{KW_SET_TEMP}{SEPARATOR}{value}"),
            Command::SetMaxDuty(value) => write!(out, "{KW_SET_DUTY}{SEPARATOR}{value}"),
            Command::HeaterOn => out.write_str(KW_HEATER_ON),
            Command::HeaterOff => out.write_str(KW_HEATER_OFF),
        }
    }
}

fn parse_argument<T: FromStr>(argument: Option<&str>) -> Result<T, ParseError> {
    match argument {
        None | Some("") => Err(ParseError::MissingArgument),
        Some(text) => text.parse().map_err(|_| ParseError::InvalidArgument),
    }
}

fn no_argument(argument: Option<&str>, command: Command) -> Result<Command, ParseError> {
    match argument {
        None => Ok(command),
        Some(_) => Err(ParseError::UnexpectedArgument),
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseError::Empty => "empty line",
            ParseError::UnknownCommand => "unknown command",
            ParseError::MissingArgument => "missing argument",
            ParseError::InvalidArgument => "invalid argument",
            ParseError::UnexpectedArgument => "unexpected argument",
        };
        f.write_str(text)
    }
}
