//! Console presentation. Errors are plain values everywhere else; this is
//! the only module that styles and prints diagnostics.

// ANSI escape codes for styling
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

pub fn error(message: &str) {
    eprintln!("{}Error: {}{}", RED, message, RESET);
}

/// Green status line, used by verbose mode.
pub fn note(message: &str) {
    println!("{}{}{}", GREEN, message, RESET);
}

/// Yellow `name: value` diagnostic line, used by verbose mode.
pub fn field(name: &str, value: &str) {
    println!("{}{}: {}{}", YELLOW, name, value, RESET);
}
