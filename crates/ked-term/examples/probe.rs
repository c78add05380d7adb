// SPDX-License-Identifier: MIT
//
// ked-term probe: ask the terminal where the cursor is, then how big it is.
//
// Opens /dev/tty, switches to raw mode with a three-second read timeout,
// sends a bare cursor position request, then runs the full overshoot probe.
// The results are printed after the guard has put the terminal back, so
// they show up on a normally-behaving terminal.
//
// Usage:
//   cargo run -p ked-term --example probe

use std::process;

use ked_term::geometry::{parse_cursor_report, probe};
use ked_term::{EscapeChannel, RawModeGuard, ReadPolicy, TerminalDevice};

fn main() {
    if let Err(e) = run() {
        eprintln!("probe: {e}");
        process::exit(1);
    }
}

fn run() -> ked_term::Result<()> {
    let mut tty = TerminalDevice::open()?;

    let (reply, geometry) = {
        let mut guard = RawModeGuard::enter(&mut tty, ReadPolicy::polling(30))?;
        let mut channel = EscapeChannel::new(&mut *guard);
        let reply = channel.send("6n", true)?;
        let geometry = probe(&mut channel)?;
        drop(channel);
        guard.exit()?;
        (reply, geometry)
    };

    match reply.as_deref().map(parse_cursor_report) {
        Some(Ok(pos)) => println!("cursor was at row {}, col {}", pos.row, pos.col),
        Some(Err(e)) => println!("unreadable reply: {e}"),
        None => println!("no reply before timeout"),
    }
    println!("terminal is {} rows by {} cols", geometry.rows(), geometry.cols());
    Ok(())
}
