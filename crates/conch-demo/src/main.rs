#![forbid(unsafe_code)]

//! Interactive conch demo on a real terminal.
//!
//! Puts the terminal into raw mode, pipes stdin bytes into a
//! [`TerminalSession`], and writes everything the engine produces straight
//! back to stdout. A reader thread feeds bytes over a channel so the main
//! loop keeps pumping program lifecycle messages while the keyboard is idle.
//!
//! Logging goes to stderr and stays silent unless `RUST_LOG` says otherwise.

mod commands;

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use conch_core::{CommandRegistry, PrintSink, SessionConfig, TerminalSession};
use tracing_subscriber::EnvFilter;

/// End-of-transmission; quits the demo while the editor owns the terminal.
const EOT: u8 = 0x04;

struct StdoutSink;

impl PrintSink for StdoutSink {
    fn write(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }
}

/// Keeps the terminal in raw mode for its lifetime.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore, ignore errors during cleanup.
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    for descriptor in commands::all() {
        if let Err(err) = registry.register(descriptor) {
            tracing::warn!(%err, "command did not register cleanly");
        }
    }
    registry
}

fn spawn_stdin_reader() -> mpsc::Receiver<u8> {
    let (byte_tx, byte_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut buf = [0u8; 64];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    for &b in &buf[..n] {
                        if byte_tx.send(b).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });
    byte_rx
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let user = std::env::var("USER").unwrap_or_else(|_| "user".into());
    let config = SessionConfig::new()
        .with_user_name(user)
        .with_banner(commands::BANNER);

    let byte_rx = spawn_stdin_reader();
    let raw = RawModeGuard::enter()?;
    let mut session = TerminalSession::new(
        config,
        Arc::new(registry()),
        Arc::new(StdoutSink) as Arc<dyn PrintSink>,
    );

    loop {
        match byte_rx.recv_timeout(Duration::from_millis(25)) {
            Ok(EOT) if session.foreground_program().is_none() => break,
            Ok(b) => session.process_buffer(&[b]),
            Err(RecvTimeoutError::Timeout) => session.pump(),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(session);
    drop(raw);
    println!();
    Ok(())
}
