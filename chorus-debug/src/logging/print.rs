use std::io::Write;

use super::stack::{count_message, depth, indentation};
use super::symbols::{ARROW, NEWLINE};

/// Prints a debug message, indented to the current [`Timer`](super::Timer)
/// depth.
#[macro_export]
macro_rules! print_debug {
    ($format:expr) => ($crate::logging::print_indented(String::from($format), true));
    ($format:expr, $($arguments:tt)*) => ($crate::logging::print_indented(format!($format, $($arguments)*), true));
}

macro_rules! print_debug_prefix {
    ($format:expr, $($arguments:tt)*) => ($crate::logging::print_indented(format!($format, $($arguments)*), false));
}

pub(crate) use print_debug_prefix;

/// Writes a message to stdout. Nested messages are indented and the first
/// message inside a [`Timer`](super::Timer) breaks the timer's line.
pub fn print_indented(message: String, newline: bool) {
    let offset = indentation();
    let mut stdout = std::io::stdout().lock();

    if depth() > 0 && count_message() == 0 {
        let _ = writeln!(stdout, " {ARROW} started");
    }

    if offset != 0 {
        let _ = write!(stdout, "{:offset$}{NEWLINE} ", "");
    }

    let _ = match newline {
        true => writeln!(stdout, "{message}"),
        false => write!(stdout, "{message}"),
    };
}
