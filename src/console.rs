//! Operator-facing console helpers: red diagnostics and line prompts.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

/// Prints a diagnostic in red. Recoverable input mistakes come through
/// here so they stand out from the telemetry echo.
pub fn alert(mesg: &str) {
    println!("{}", mesg.red());
}

/// Shows `text`, then reads one line from `input` and returns it
/// trimmed. An exhausted input stream is an error; the session must
/// never spin on a closed stdin.
pub fn prompt<R: BufRead>(input: &mut R, text: &str) -> io::Result<String> {
    print!("{}", text);
    io::stdout().flush()?;
    let mut reply = String::new();
    let n = input.read_line(&mut reply)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input stream closed mid-session",
        ));
    }
    Ok(reply.trim().to_string())
}
