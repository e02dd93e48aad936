#![forbid(unsafe_code)]

//! Output sinks and dispatch result reporting.
//!
//! The session never writes to a device directly; every byte it emits goes
//! through a caller-supplied [`PrintSink`]. Two paths exist: an always-on
//! print path and an echo path that is silenced while local echo is off.

use std::sync::Mutex;

use crate::program::ExitCode;

/// Where the session writes its output bytes.
///
/// Implementations must tolerate being called from the session context and
/// from worker threads concurrently.
pub trait PrintSink: Send + Sync {
    /// Emit `bytes` to the terminal device.
    fn write(&self, bytes: &[u8]);
}

/// A sink that captures everything into an in-memory buffer.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Mutex<Vec<u8>>,
}

impl MemorySink {
    /// Create an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Everything written so far, lossily decoded for assertions.
    #[must_use]
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Drain the captured bytes.
    pub fn take(&self) -> Vec<u8> {
        self.buffer.lock().map(|mut b| std::mem::take(&mut *b)).unwrap_or_default()
    }
}

impl PrintSink for MemorySink {
    fn write(&self, bytes: &[u8]) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.extend_from_slice(bytes);
        }
    }
}

/// Everything a result printer needs to report one dispatch outcome.
pub struct ReportContext<'a> {
    /// The exit code being reported.
    pub code: ExitCode,
    /// The submitted line, still intact (`NotFound` echoes it back).
    pub input: &'a str,
    /// The session prompt.
    pub prompt: &'a str,
    sink: &'a dyn PrintSink,
    echo_enabled: bool,
}

impl<'a> ReportContext<'a> {
    pub(crate) fn new(
        code: ExitCode,
        input: &'a str,
        prompt: &'a str,
        sink: &'a dyn PrintSink,
        echo_enabled: bool,
    ) -> Self {
        Self {
            code,
            input,
            prompt,
            sink,
            echo_enabled,
        }
    }

    /// Write through the always-on path.
    pub fn print(&self, text: &str) {
        self.sink.write(text.as_bytes());
    }

    /// Write through the echo path (dropped while echo is off).
    pub fn echo(&self, text: &str) {
        if self.echo_enabled {
            self.print(text);
        }
    }
}

/// Caller-overridable dispatch result printer.
pub type ErrorPrinter = Box<dyn Fn(&ReportContext<'_>) + Send>;

/// The stock result printer.
///
/// Success reprints the prompt; an error code is spelled out with its wire
/// value; `NotFound` echoes the rejected input with a hint. `ProcessStarted`
/// prints nothing, the running program owns the terminal now.
pub fn default_error_printer(ctx: &ReportContext<'_>) {
    match ctx.code {
        ExitCode::Success => ctx.echo(&format!("\r\n{}", ctx.prompt)),
        ExitCode::Error | ExitCode::Code(_) => ctx.echo(&format!(
            "\r\nTask returned with error code {}\r\n{}",
            ctx.code.to_byte(),
            ctx.prompt
        )),
        ExitCode::NotFound => ctx.echo(&format!(
            "\"{}\" is not a valid command. Type \"help\" to see a list of available ones\r\n{}",
            ctx.input, ctx.prompt
        )),
        ExitCode::ProcessStarted => {}
    }
}
