//! Terminal output helpers

use std::io::IsTerminal;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

/// Print an error message in red with an X prefix
///
/// Outputs to stdout, so failures land next to the command's own output.
/// When stdout is not a terminal the message is printed as-is.
pub fn print_error(msg: &str) {
    let mut stdout = std::io::stdout();
    if !stdout.is_terminal() {
        println!("{}", msg);
        return;
    }
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
///
/// Outputs to stderr; used where tracing is not set up.
pub fn print_warning(msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
