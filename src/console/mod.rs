//! Console front end: input commands and message display.

pub mod commands;
pub mod formatter;

pub use commands::{parse_line, Command};
pub use formatter::MessageFormatter;
