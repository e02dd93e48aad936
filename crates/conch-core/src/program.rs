#![forbid(unsafe_code)]

//! Programs: spawned command instances and their worker-side API.
//!
//! Dispatching a line spawns one worker thread per command. The worker owns a
//! [`ProgramContext`] carrying its private byte channel and the sending half
//! of its control channel; the session keeps the matching [`ProgramHandle`].
//! Workers never touch session state directly, they only send control
//! messages. Two send disciplines exist: everything lifecycle-advisory goes
//! out best-effort (`try_send`, dropped if the queue is full), while the
//! final `Return` uses a blocking send because it is the only path that frees
//! the program.

use std::error::Error;
use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::print::PrintSink;
use crate::registry::{CommandDescriptor, CommandRegistry};
use crate::tokenizer::{self, TokenizeError};

/// How raw input is routed while a program holds the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Bytes are discarded.
    #[default]
    None,
    /// Bytes go straight to the program's byte channel.
    Direct,
    /// The line editor collects a full line, then delivers it.
    LineCapture,
}

/// Result of one command dispatch, as seen by the result printer.
///
/// The named variants map to fixed wire bytes; anything else is a
/// command-specific [`ExitCode::Code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Command completed fine.
    Success,
    /// Command failed.
    Error,
    /// The line did not resolve to a registered command.
    NotFound,
    /// The command is asynchronous and now runs as a program; no final
    /// result yet.
    ProcessStarted,
    /// Command-specific result byte.
    Code(u8),
}

impl ExitCode {
    /// The wire byte for this code.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            ExitCode::Error => 0x00,
            ExitCode::NotFound => 0x01,
            ExitCode::Success => 0xFF,
            ExitCode::ProcessStarted => 0xFE,
            ExitCode::Code(b) => b,
        }
    }

    /// Decode a wire byte.
    #[must_use]
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => ExitCode::Error,
            0x01 => ExitCode::NotFound,
            0xFF => ExitCode::Success,
            0xFE => ExitCode::ProcessStarted,
            other => ExitCode::Code(other),
        }
    }
}

/// Lifecycle messages a worker sends to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlMessage {
    /// Ask for the foreground slot. Silently dropped if another program
    /// holds it.
    EnterForeground,
    /// Give the terminal back without terminating.
    ExitForeground,
    /// Change how keystrokes are routed.
    SetInputMode(InputMode),
    /// The entry point returned. Sent blocking; must never be lost.
    Return(ExitCode),
    /// Reserved for forceful cancellation; currently a no-op.
    Kill,
}

/// Errors from program byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// No byte arrived within the timeout.
    TimedOut,
    /// The session side of the channel is gone.
    Closed,
    /// A forwarded Ctrl-C cut the captured line short.
    Interrupted,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::TimedOut => write!(f, "read timed out"),
            ReadError::Closed => write!(f, "input channel closed"),
            ReadError::Interrupted => write!(f, "read interrupted"),
        }
    }
}

impl Error for ReadError {}

/// Worker thread creation failed.
#[derive(Debug)]
pub struct SpawnError {
    source: io::Error,
}

impl SpawnError {
    pub(crate) fn new(source: io::Error) -> Self {
        Self { source }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to spawn command worker: {}", self.source)
    }
}

impl Error for SpawnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Tokenized arguments of one dispatched line.
///
/// One owned line plus byte ranges into it; token 0 is the command word.
#[derive(Debug, Clone)]
pub struct ProgramArgs {
    line: String,
    spans: Vec<Range<usize>>,
}

impl ProgramArgs {
    pub(crate) fn parse(line: &str) -> Result<Self, TokenizeError> {
        let spans = tokenizer::token_spans(line)?;
        Ok(Self {
            line: line.to_owned(),
            spans,
        })
    }

    /// The full submitted line.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Token `index`; index 0 is the command word.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.spans.get(index).map(|span| &self.line[span.clone()])
    }

    /// Number of tokens, command word included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether the line held no tokens at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// All tokens in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|span| &self.line[span.clone()])
    }

    /// The tokens after the command word.
    pub fn rest(&self) -> impl Iterator<Item = &str> {
        self.iter().skip(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ProgramId(pub(crate) u64);

/// One step of draining a program's control queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlPoll {
    Message(ControlMessage),
    Empty,
    Disconnected,
}

/// What a command entry point runs against, on its worker thread.
pub struct ProgramContext {
    cmd: Arc<CommandDescriptor>,
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn PrintSink>,
    echo_enabled: Arc<AtomicBool>,
    byte_rx: Receiver<u8>,
    control_tx: SyncSender<ControlMessage>,
    line_capacity: usize,
}

impl ProgramContext {
    /// The descriptor this program was spawned from.
    #[must_use]
    pub fn command(&self) -> &CommandDescriptor {
        &self.cmd
    }

    /// The shared command registry.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Write to the terminal through the always-on path.
    pub fn print(&self, text: &str) {
        self.sink.write(text.as_bytes());
    }

    /// Write through the echo path; dropped while local echo is off.
    pub fn echo(&self, text: &str) {
        if self.echo_enabled.load(Ordering::Relaxed) {
            self.print(text);
        }
    }

    /// Read one byte from the program's private channel.
    ///
    /// `None` blocks until a byte arrives or the session goes away.
    pub fn read_byte(&self, timeout: Option<Duration>) -> Result<u8, ReadError> {
        match timeout {
            Some(limit) => self.byte_rx.recv_timeout(limit).map_err(|err| match err {
                RecvTimeoutError::Timeout => ReadError::TimedOut,
                RecvTimeoutError::Disconnected => ReadError::Closed,
            }),
            None => self.byte_rx.recv().map_err(|_| ReadError::Closed),
        }
    }

    /// Capture one full line of input.
    ///
    /// Switches the session to LineCapture and reads until the line
    /// terminator. The timeout applies per byte. The captured line is capped
    /// at the session's input-buffer capacity.
    pub fn read_line(&self, timeout: Option<Duration>) -> Result<String, ReadError> {
        // Bytes queued before the call belong to the previous read.
        while self.byte_rx.try_recv().is_ok() {}
        self.set_input_mode(InputMode::LineCapture);
        let mut line = Vec::new();
        loop {
            match self.read_byte(timeout)? {
                b'\n' => break,
                0x03 => return Err(ReadError::Interrupted),
                b => {
                    if line.len() < self.line_capacity {
                        line.push(b);
                    }
                }
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Ask the session to route input per `mode`.
    pub fn set_input_mode(&self, mode: InputMode) {
        self.send_control(ControlMessage::SetInputMode(mode));
    }

    /// Ask for the foreground slot.
    pub fn enter_foreground(&self) {
        self.send_control(ControlMessage::EnterForeground);
    }

    /// Give the terminal back to the line editor without terminating.
    pub fn exit_foreground(&self) {
        self.send_control(ControlMessage::ExitForeground);
    }

    /// Ask to be cancelled. Currently acknowledged but not acted on.
    pub fn request_kill(&self) {
        self.send_control(ControlMessage::Kill);
    }

    fn send_control(&self, message: ControlMessage) {
        match self.control_tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                crate::debug!("control queue full, message dropped");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Session-side record of one spawned program.
#[derive(Debug)]
pub(crate) struct ProgramHandle {
    id: ProgramId,
    cmd: Arc<CommandDescriptor>,
    byte_tx: SyncSender<u8>,
    control_rx: Receiver<ControlMessage>,
    input_mode: InputMode,
    worker: Option<JoinHandle<()>>,
}

impl ProgramHandle {
    pub(crate) fn id(&self) -> ProgramId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        self.cmd.name()
    }

    pub(crate) fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub(crate) fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = mode;
    }

    /// Forward a byte, dropping it if the program is not keeping up.
    pub(crate) fn send_byte(&self, b: u8) {
        match self.byte_tx.try_send(b) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                crate::trace!(command = self.name(), byte = b, "byte channel full, dropped");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Next pending control message.
    ///
    /// `Disconnected` means the worker is gone without having delivered
    /// `Return` (it panicked); the session tears the program down as if it
    /// had returned an error.
    pub(crate) fn poll_control(&self) -> ControlPoll {
        match self.control_rx.try_recv() {
            Ok(message) => ControlPoll::Message(message),
            Err(TryRecvError::Empty) => ControlPoll::Empty,
            Err(TryRecvError::Disconnected) => ControlPoll::Disconnected,
        }
    }

    /// Wait for the worker to finish. Only called after `Return` was
    /// received, so the wait is momentary.
    pub(crate) fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                crate::warn!(command = self.cmd.name(), "command worker panicked");
            }
        }
    }
}

/// Channel bounds and sizing for one program spawn.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpawnLimits {
    pub(crate) byte_channel_bound: usize,
    pub(crate) control_channel_bound: usize,
    pub(crate) line_capacity: usize,
}

/// Spawn a worker for `cmd` and hand back the session-side handle.
///
/// The worker asks for the foreground, runs the entry point, then delivers
/// `Return` with a blocking send.
pub(crate) fn spawn_program(
    id: ProgramId,
    cmd: Arc<CommandDescriptor>,
    args: ProgramArgs,
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn PrintSink>,
    echo_enabled: Arc<AtomicBool>,
    limits: SpawnLimits,
) -> Result<ProgramHandle, SpawnError> {
    let (byte_tx, byte_rx) = mpsc::sync_channel(limits.byte_channel_bound.max(1));
    let (control_tx, control_rx) = mpsc::sync_channel(limits.control_channel_bound.max(1));

    let entry = cmd.entry();
    let return_tx = control_tx.clone();
    let mut ctx = ProgramContext {
        cmd: Arc::clone(&cmd),
        registry,
        sink,
        echo_enabled,
        byte_rx,
        control_tx,
        line_capacity: limits.line_capacity,
    };

    let mut builder = thread::Builder::new().name(format!("conch-{}", cmd.name()));
    if cmd.stack_size() > 0 {
        builder = builder.stack_size(cmd.stack_size());
    }
    let worker = builder
        .spawn(move || {
            ctx.enter_foreground();
            let code = entry(&mut ctx, &args);
            if return_tx.send(ControlMessage::Return(code)).is_err() {
                crate::debug!("session gone before return code was delivered");
            }
        })
        .map_err(SpawnError::new)?;

    Ok(ProgramHandle {
        id,
        cmd,
        byte_tx,
        control_rx,
        input_mode: InputMode::None,
        worker: Some(worker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::MemorySink;

    fn noop(_ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
        ExitCode::Success
    }

    fn test_context(
        byte_bound: usize,
    ) -> (ProgramContext, SyncSender<u8>, Receiver<ControlMessage>) {
        let (byte_tx, byte_rx) = mpsc::sync_channel(byte_bound);
        let (control_tx, control_rx) = mpsc::sync_channel(8);
        let ctx = ProgramContext {
            cmd: Arc::new(CommandDescriptor::new("test", "", noop)),
            registry: Arc::new(CommandRegistry::new()),
            sink: Arc::new(MemorySink::new()),
            echo_enabled: Arc::new(AtomicBool::new(true)),
            byte_rx,
            control_tx,
            line_capacity: 128,
        };
        (ctx, byte_tx, control_rx)
    }

    #[test]
    fn exit_code_wire_round_trip() {
        for code in [
            ExitCode::Success,
            ExitCode::Error,
            ExitCode::NotFound,
            ExitCode::ProcessStarted,
            ExitCode::Code(42),
        ] {
            assert_eq!(ExitCode::from_byte(code.to_byte()), code);
        }
        assert_eq!(ExitCode::Success.to_byte(), 0xFF);
        assert_eq!(ExitCode::Error.to_byte(), 0x00);
        assert_eq!(ExitCode::NotFound.to_byte(), 0x01);
        assert_eq!(ExitCode::ProcessStarted.to_byte(), 0xFE);
    }

    #[test]
    fn args_index_from_command_word() {
        let args = ProgramArgs::parse("echo \"hello there\" world").unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some("echo"));
        assert_eq!(args.get(1), Some("hello there"));
        assert_eq!(args.get(2), Some("world"));
        assert_eq!(args.get(3), None);
        assert_eq!(args.rest().collect::<Vec<_>>(), ["hello there", "world"]);
    }

    #[test]
    fn read_byte_times_out() {
        let (ctx, _byte_tx, _control_rx) = test_context(4);
        assert_eq!(
            ctx.read_byte(Some(Duration::from_millis(10))),
            Err(ReadError::TimedOut)
        );
    }

    #[test]
    fn read_byte_sees_disconnect() {
        let (ctx, byte_tx, _control_rx) = test_context(4);
        drop(byte_tx);
        assert_eq!(ctx.read_byte(None), Err(ReadError::Closed));
    }

    #[test]
    fn read_line_collects_until_newline() {
        let (ctx, byte_tx, control_rx) = test_context(16);
        let reader = thread::spawn(move || ctx.read_line(Some(Duration::from_secs(5))));
        // The capture request only goes out once read_line is past its
        // stale-byte drain, so bytes sent from here on are kept.
        assert_eq!(
            control_rx.recv_timeout(Duration::from_secs(5)),
            Ok(ControlMessage::SetInputMode(InputMode::LineCapture))
        );
        for &b in b"hi there\n" {
            byte_tx.send(b).unwrap();
        }
        assert_eq!(reader.join().unwrap(), Ok("hi there".to_owned()));
    }

    #[test]
    fn read_line_discards_stale_bytes() {
        let (ctx, byte_tx, control_rx) = test_context(16);
        for &b in b"stale" {
            byte_tx.send(b).unwrap();
        }
        let reader = thread::spawn(move || ctx.read_line(Some(Duration::from_secs(5))));
        control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for &b in b"fresh\n" {
            byte_tx.send(b).unwrap();
        }
        assert_eq!(reader.join().unwrap(), Ok("fresh".to_owned()));
    }

    #[test]
    fn read_line_interrupted_by_ctrl_c() {
        let (ctx, byte_tx, control_rx) = test_context(16);
        let reader = thread::spawn(move || ctx.read_line(Some(Duration::from_secs(5))));
        control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        byte_tx.send(b'h').unwrap();
        byte_tx.send(0x03).unwrap();
        assert_eq!(reader.join().unwrap(), Err(ReadError::Interrupted));
    }

    #[test]
    fn control_sends_are_best_effort() {
        let (ctx, _byte_tx, control_rx) = test_context(4);
        ctx.enter_foreground();
        ctx.exit_foreground();
        ctx.request_kill();
        assert_eq!(control_rx.try_recv(), Ok(ControlMessage::EnterForeground));
        assert_eq!(control_rx.try_recv(), Ok(ControlMessage::ExitForeground));
        assert_eq!(control_rx.try_recv(), Ok(ControlMessage::Kill));
    }
}
