#![forbid(unsafe_code)]

//! The terminal session.
//!
//! One session owns the full input path: raw bytes from the host are decoded
//! into key events, key events drive the line editor (or are routed to the
//! foreground program), completed lines dispatch through the registry, and
//! spawned programs talk back through their control queues. All session
//! state is mutated from `process_buffer`/`pump` only; worker threads
//! communicate exclusively through channels.
//!
//! Dropping a session disconnects every program's channels: blocked readers
//! observe the closure and the workers wind down on their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;

use crate::autocomplete::{self, CandidateCycle, CompletionQuery, Completions};
use crate::buffer::EditBuffer;
use crate::config::SessionConfig;
use crate::decoder::KeyDecoder;
use crate::event::KeyEvent;
use crate::history::HistoryRing;
use crate::print::{default_error_printer, ErrorPrinter, PrintSink, ReportContext};
use crate::program::{
    self, ControlMessage, ControlPoll, ExitCode, InputMode, ProgramArgs, ProgramHandle, ProgramId,
    SpawnLimits,
};
use crate::registry::CommandRegistry;
use crate::vt100;

bitflags! {
    /// Which pending previews to commit before an editor operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct CheckScope: u8 {
        /// Commit a pending autocomplete selection.
        const COMPLETION = 0b01;
        /// Commit a pending history browse.
        const HISTORY    = 0b10;
    }
}

/// One shell instance.
pub struct TerminalSession {
    prompt: String,
    banner: String,
    decoder: KeyDecoder,
    buffer: EditBuffer,
    history: HistoryRing,
    completion: Option<CandidateCycle>,
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn PrintSink>,
    error_printer: ErrorPrinter,
    echo_default: bool,
    echo_enabled: Arc<AtomicBool>,
    programs: Vec<ProgramHandle>,
    foreground: Option<ProgramId>,
    next_program_id: u64,
    limits: SpawnLimits,
    events: Vec<KeyEvent>,
}

impl TerminalSession {
    /// Create a session and print the startup banner.
    ///
    /// The registry should be fully populated; it is shared read-only with
    /// every spawned program.
    pub fn new(
        config: SessionConfig,
        registry: Arc<CommandRegistry>,
        sink: Arc<dyn PrintSink>,
    ) -> Self {
        let session = Self {
            prompt: format!("{}@{}>", config.user_name, config.shell_name),
            banner: config.banner,
            decoder: KeyDecoder::new(),
            buffer: EditBuffer::new(config.input_capacity),
            history: HistoryRing::new(config.history_slots),
            completion: None,
            registry,
            sink,
            error_printer: Box::new(default_error_printer),
            echo_default: config.echo,
            echo_enabled: Arc::new(AtomicBool::new(config.echo)),
            programs: Vec::new(),
            foreground: None,
            next_program_id: 0,
            limits: SpawnLimits {
                byte_channel_bound: config.byte_channel_bound,
                control_channel_bound: config.control_channel_bound,
                line_capacity: config.input_capacity,
            },
            events: Vec::new(),
        };
        session.print_boot_message();
        session
    }

    /// Feed raw input bytes.
    ///
    /// The sole ingress point: decodes, routes, and fully consumes `bytes`.
    /// Pending program lifecycle messages are drained before every byte, so
    /// lifecycle events and keystrokes observe a total order.
    pub fn process_buffer(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.drain_control();
            let mut events = std::mem::take(&mut self.events);
            self.decoder.advance(b, &mut events);
            for event in events.drain(..) {
                self.handle_event(event);
            }
            self.events = events;
        }
    }

    /// Drain pending program lifecycle messages without feeding input.
    ///
    /// Hosts call this periodically while idle so program completion is
    /// reported promptly.
    pub fn pump(&mut self) {
        self.drain_control();
    }

    /// Replace the dispatch result printer.
    pub fn set_error_printer(&mut self, printer: ErrorPrinter) {
        self.error_printer = printer;
    }

    /// The prompt string (`user@name>`).
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The current edit-line contents.
    #[must_use]
    pub fn current_line(&self) -> &str {
        self.buffer.as_str()
    }

    /// The current cursor position within the edit line.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// The shared command registry.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Name of the program holding the foreground, if any.
    #[must_use]
    pub fn foreground_program(&self) -> Option<&str> {
        let id = self.foreground?;
        self.programs
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.name())
    }

    /// Number of programs not yet torn down.
    #[must_use]
    pub fn running_programs(&self) -> usize {
        self.programs.len()
    }

    // ── Control-message handling ─────────────────────────────────────────

    fn drain_control(&mut self) {
        let mut pending: Vec<(ProgramId, ControlMessage)> = Vec::new();
        let mut vanished: Vec<ProgramId> = Vec::new();
        for handle in &self.programs {
            loop {
                match handle.poll_control() {
                    ControlPoll::Message(message) => pending.push((handle.id(), message)),
                    ControlPoll::Empty => break,
                    ControlPoll::Disconnected => {
                        vanished.push(handle.id());
                        break;
                    }
                }
            }
        }
        for (id, message) in pending {
            self.handle_control(id, message);
        }
        for id in vanished {
            // Still present means the worker died without delivering Return.
            if self.programs.iter().any(|p| p.id() == id) {
                crate::warn!(program = id.0, "worker vanished without a return code");
                self.handle_return(id, ExitCode::Error);
            }
        }
    }

    fn handle_control(&mut self, id: ProgramId, message: ControlMessage) {
        match message {
            ControlMessage::EnterForeground => self.handle_enter_foreground(id),
            ControlMessage::ExitForeground => self.handle_exit_foreground(id),
            ControlMessage::SetInputMode(mode) => self.handle_set_input_mode(id, mode),
            ControlMessage::Return(code) => self.handle_return(id, code),
            ControlMessage::Kill => {
                crate::debug!(program = id.0, "kill requested, not supported yet");
            }
        }
    }

    /// Admit a program to the foreground. At most one program may hold the
    /// slot; a second request is dropped, not queued.
    fn handle_enter_foreground(&mut self, id: ProgramId) {
        if self.foreground.is_some() {
            crate::debug!(program = id.0, "foreground slot taken, request dropped");
            return;
        }
        let Some(idx) = self.programs.iter().position(|p| p.id() == id) else {
            return;
        };
        self.programs[idx].set_input_mode(InputMode::Direct);
        self.foreground = Some(id);
        self.set_echo(false);
        self.buffer.clear();
    }

    fn handle_exit_foreground(&mut self, id: ProgramId) {
        if self.foreground != Some(id) {
            return;
        }
        self.foreground = None;
        self.restore_echo();
        self.buffer.clear();
    }

    fn handle_set_input_mode(&mut self, id: ProgramId, mode: InputMode) {
        let Some(idx) = self.programs.iter().position(|p| p.id() == id) else {
            return;
        };
        self.programs[idx].set_input_mode(mode);
        if self.foreground == Some(id) {
            match mode {
                InputMode::LineCapture => {
                    // Captured lines start clean and are visible while typed.
                    self.buffer.clear();
                    self.restore_echo();
                }
                InputMode::Direct | InputMode::None => self.set_echo(false),
            }
        } else if mode == InputMode::LineCapture {
            // Not foreground: no line will ever arrive, unblock it.
            self.programs[idx].send_byte(b'\n');
        }
    }

    /// Tear a returned program down, exactly once.
    fn handle_return(&mut self, id: ProgramId, code: ExitCode) {
        let Some(idx) = self.programs.iter().position(|p| p.id() == id) else {
            crate::trace!(program = id.0, "return for a program already torn down");
            return;
        };
        let mut handle = self.programs.remove(idx);
        handle.join_worker();
        crate::debug!(command = handle.name(), code = code.to_byte(), "program returned");
        if self.foreground == Some(id) {
            self.foreground = None;
            self.restore_echo();
            self.buffer.clear();
        }
        self.print(&format!(
            "Command {} finished with code {}\r\n",
            handle.name(),
            code.to_byte()
        ));
        self.echo(&format!("\r{}{}", self.prompt, self.buffer.as_str()));
    }

    // ── Key-event routing ────────────────────────────────────────────────

    fn handle_event(&mut self, event: KeyEvent) {
        // Ctrl-C routes ahead of everything, whatever the input mode.
        if event == KeyEvent::Byte(0x03) {
            self.handle_ctrl_c();
            return;
        }

        if let Some(id) = self.foreground {
            let mode = self
                .programs
                .iter()
                .find(|p| p.id() == id)
                .map_or(InputMode::None, |p| p.input_mode());
            match mode {
                InputMode::Direct => {
                    if let KeyEvent::Byte(b) = event {
                        if let Some(handle) = self.programs.iter().find(|p| p.id() == id) {
                            handle.send_byte(b);
                        }
                    } else {
                        crate::trace!(?event, "decoded event not forwarded in direct mode");
                    }
                    return;
                }
                InputMode::None => return,
                // The line editor collects the line below.
                InputMode::LineCapture => {}
            }
        }

        match event {
            KeyEvent::Byte(b'\r') => self.handle_enter(),
            KeyEvent::Byte(0x08) | KeyEvent::Byte(0x7F) => self.handle_backspace(),
            KeyEvent::Byte(b'\t') => self.handle_tab(true),
            KeyEvent::BackTab => self.handle_tab(false),
            KeyEvent::CursorUp => self.handle_history(true),
            KeyEvent::CursorDown => self.handle_history(false),
            KeyEvent::CursorForward => self.handle_cursor_forward(),
            KeyEvent::CursorBack => self.handle_cursor_back(),
            KeyEvent::Home => self.handle_home(),
            KeyEvent::End => self.handle_end(),
            KeyEvent::Reset => self.handle_reset(),
            KeyEvent::Byte(b @ 0x20..=0x7E) => self.handle_printable(b),
            KeyEvent::Byte(other) => {
                self.echo_diagnostic(&format!("unknown code received: 0x{other:02x}\r\n"));
            }
            KeyEvent::Insert
            | KeyEvent::Delete
            | KeyEvent::PageUp
            | KeyEvent::PageDown
            | KeyEvent::CursorMove { .. }
            | KeyEvent::Invalid => {
                crate::trace!(?event, "key event ignored by the line editor");
            }
        }
    }

    fn handle_ctrl_c(&mut self) {
        if let Some(id) = self.foreground {
            // The program decides what interruption means.
            if let Some(handle) = self.programs.iter().find(|p| p.id() == id) {
                handle.send_byte(0x03);
            }
            self.echo("^C");
        } else {
            self.completion = None;
            self.echo("\n^C");
            self.buffer.clear();
            self.echo(&format!("\r\n{}", self.prompt));
        }
    }

    // ── Line editing ─────────────────────────────────────────────────────

    fn handle_enter(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);

        if !self.buffer.is_empty() {
            self.echo("\r\n");
            if let Some(id) = self.foreground {
                // A captured line goes to the program, not to history.
                if let Some(handle) = self.programs.iter().find(|p| p.id() == id) {
                    for &b in self.buffer.as_bytes() {
                        handle.send_byte(b);
                    }
                    handle.send_byte(b'\n');
                }
                self.buffer.clear();
            } else {
                let line = self.buffer.as_str().to_owned();
                self.history.submit(&line);
                let code = self.interpret(&line);
                self.report(code, &line);
                self.buffer.clear();
            }
        } else if let Some(id) = self.foreground {
            // Empty captured line.
            if let Some(handle) = self.programs.iter().find(|p| p.id() == id) {
                handle.send_byte(b'\n');
            }
        } else {
            self.echo(&format!("\r\n{}", self.prompt));
        }
    }

    fn handle_printable(&mut self, b: u8) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        let mid_buffer = !self.buffer.cursor_at_end();
        match self.buffer.insert(b) {
            Ok(()) => {
                if mid_buffer {
                    // Reprint the shifted tail, then pull the cursor back
                    // over it.
                    let tail_start = self.buffer.cursor() - 1;
                    let tail = self.tail_from(tail_start);
                    self.echo(vt100::ERASE_LINE_END);
                    self.echo(&tail);
                    self.echo(&vt100::cursor_back_by(tail.len() - 1));
                } else {
                    self.echo(&(b as char).to_string());
                }
            }
            Err(_) => {
                self.echo(vt100::BELL);
                crate::warn!(byte = b, "edit buffer full, input byte dropped");
            }
        }
    }

    fn handle_backspace(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        if self.buffer.cursor() == 0 {
            return;
        }
        let mid_buffer = !self.buffer.cursor_at_end();
        self.buffer.backspace();
        if mid_buffer {
            let tail = self.tail_from(self.buffer.cursor());
            self.echo("\x08");
            self.echo(vt100::ERASE_LINE_END);
            self.echo(&tail);
            self.echo(&vt100::cursor_back_by(tail.len()));
        } else {
            self.echo("\x08 \x08");
        }
    }

    fn handle_cursor_forward(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        if self.buffer.move_right() {
            self.echo(&vt100::cursor_forward_by(1));
        }
    }

    fn handle_cursor_back(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        if self.buffer.move_left() {
            self.echo(&vt100::cursor_back_by(1));
        }
    }

    fn handle_home(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        let moved = self.buffer.home();
        if moved > 0 {
            self.echo(&vt100::cursor_back_by(moved));
        }
    }

    fn handle_end(&mut self) {
        self.check_for_copy(CheckScope::COMPLETION | CheckScope::HISTORY);
        let moved = self.buffer.end();
        if moved > 0 {
            self.echo(&vt100::cursor_forward_by(moved));
        }
    }

    fn handle_history(&mut self, up: bool) {
        self.check_for_copy(CheckScope::COMPLETION);
        if self.foreground.is_some() {
            return;
        }
        let preview = if up {
            self.history.up().map(str::to_owned)
        } else {
            self.history.down().map(str::to_owned)
        };
        match preview {
            Some(line) => {
                self.echo(vt100::ERASE_LINE);
                self.echo(&format!("\r{}{}", self.prompt, line));
            }
            None => {
                self.echo(vt100::BELL);
                self.echo(vt100::ERASE_LINE);
                self.echo(&format!("\r{}{}", self.prompt, self.buffer.as_str()));
            }
        }
    }

    fn handle_tab(&mut self, forward: bool) {
        self.check_for_copy(CheckScope::HISTORY);
        if self.foreground.is_some() {
            return;
        }
        if self.completion.is_none() {
            self.completion = Some(self.build_candidates());
        }
        let (step, start) = {
            let Some(cycle) = self.completion.as_mut() else {
                return;
            };
            let step = if forward {
                cycle.cycle_forward().map(str::to_owned)
            } else {
                cycle.cycle_back().map(str::to_owned)
            };
            (step, cycle.start())
        };
        match step {
            Some(candidate) => {
                let line = self.buffer.as_str();
                let prefix = line.get(..start).unwrap_or(line).to_owned();
                let shown = autocomplete::quoted(&candidate).into_owned();
                self.echo(vt100::ERASE_LINE);
                self.echo(&format!("\r{}{}{}", self.prompt, prefix, shown));
            }
            None => {
                // Wrapped back to "nothing selected": restore the line and
                // drop the candidates.
                self.completion = None;
                self.echo(vt100::BELL);
                self.echo(vt100::ERASE_LINE);
                self.echo(&format!("\r{}{}", self.prompt, self.buffer.as_str()));
            }
        }
    }

    fn handle_reset(&mut self) {
        if self.foreground.is_some() {
            return;
        }
        self.print_boot_message();
    }

    /// Commit pending previews into the edit buffer.
    ///
    /// Ensures navigating away from an autocomplete selection or a history
    /// browse never silently loses it: the buffer always holds what the user
    /// would submit right now. The candidate list is invalidated no matter
    /// whether a selection was committed.
    fn check_for_copy(&mut self, scope: CheckScope) {
        if scope.contains(CheckScope::COMPLETION) {
            if let Some(cycle) = self.completion.take() {
                if let Some(candidate) = cycle.selected() {
                    let spliced = autocomplete::quoted(candidate);
                    self.buffer.splice_at(cycle.start(), &spliced);
                }
            }
        }
        if scope.contains(CheckScope::HISTORY) {
            if let Some(line) = self.history.commit_browse() {
                self.buffer.set_text(&line);
            }
        }
    }

    fn build_candidates(&self) -> CandidateCycle {
        let line = self.buffer.as_str();
        let prefix = line.get(..self.buffer.cursor()).unwrap_or(line);
        let (token_start, token) = autocomplete::current_token(prefix);
        let completions = match self
            .registry
            .find(prefix)
            .and_then(|cmd| cmd.completer().cloned())
        {
            Some(provider) => provider.complete(&CompletionQuery {
                line: prefix,
                token,
                token_start,
            }),
            None => Completions {
                items: autocomplete::command_name_matches(&self.registry, token),
                start: token_start,
            },
        };
        CandidateCycle::new(completions)
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Resolve and launch the command a line names.
    fn interpret(&mut self, line: &str) -> ExitCode {
        let Some(cmd) = self.registry.find(line) else {
            return ExitCode::NotFound;
        };
        let args = match ProgramArgs::parse(line) {
            Ok(args) => args,
            Err(err) => {
                self.echo(&format!("\r\nError: {err}\r\n"));
                return ExitCode::Error;
            }
        };
        let id = ProgramId(self.next_program_id);
        self.next_program_id += 1;
        match program::spawn_program(
            id,
            cmd,
            args,
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            Arc::clone(&self.echo_enabled),
            self.limits,
        ) {
            Ok(handle) => {
                self.programs.push(handle);
                ExitCode::ProcessStarted
            }
            Err(_) => {
                crate::warn!(command = line, "could not start command worker");
                ExitCode::Error
            }
        }
    }

    fn report(&self, code: ExitCode, input: &str) {
        let ctx = ReportContext::new(
            code,
            input,
            &self.prompt,
            self.sink.as_ref(),
            self.echo_enabled.load(Ordering::Relaxed),
        );
        (self.error_printer)(&ctx);
    }

    // ── Rendering ────────────────────────────────────────────────────────

    fn print(&self, text: &str) {
        self.sink.write(text.as_bytes());
    }

    fn echo(&self, text: &str) {
        if self.echo_enabled.load(Ordering::Relaxed) {
            self.print(text);
        }
    }

    fn set_echo(&self, on: bool) {
        self.echo_enabled.store(on, Ordering::Relaxed);
    }

    fn restore_echo(&self) {
        self.set_echo(self.echo_default);
    }

    fn tail_from(&self, start: usize) -> String {
        let line = self.buffer.as_str();
        line.get(start..).unwrap_or("").to_owned()
    }

    /// Print a diagnostic on its own line without losing the edit line: the
    /// prompt and buffer are redrawn below it with the cursor put back.
    fn echo_diagnostic(&self, message: &str) {
        self.echo(&format!("\r\n{message}"));
        if self.buffer.is_empty() {
            self.echo(&self.prompt);
        } else {
            self.echo(&format!("{}{}", self.prompt, self.buffer.as_str()));
            let back = self.buffer.len() - self.buffer.cursor();
            if back > 0 {
                self.echo(&vt100::cursor_back_by(back));
            }
        }
    }

    fn print_boot_message(&self) {
        self.echo(vt100::RESET);
        self.echo(vt100::CURSOR_HOME);
        self.echo(&format!("\r\n\n\n{}\r\n", self.banner));
        if self.buffer.is_empty() {
            self.echo(&format!("\r\n\r\n{}", self.prompt));
        } else {
            self.echo(&format!("\r\n\r\n{}{}", self.prompt, self.buffer.as_str()));
            let back = self.buffer.len() - self.buffer.cursor();
            if back > 0 {
                self.echo(&vt100::cursor_back_by(back));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::MemorySink;
    use crate::program::ProgramContext;
    use crate::registry::CommandDescriptor;
    use std::time::Duration;

    fn instant(_ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
        ExitCode::Success
    }

    fn base_registry() -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        for (name, desc) in [
            ("help", "list commands"),
            ("cls", "clear screen"),
            ("ls", "list"),
        ] {
            registry
                .register(CommandDescriptor::new(name, desc, instant))
                .unwrap();
        }
        Arc::new(registry)
    }

    fn new_session() -> (TerminalSession, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let session = TerminalSession::new(
            SessionConfig::new().with_user_name("u"),
            base_registry(),
            Arc::clone(&sink) as Arc<dyn PrintSink>,
        );
        sink.take();
        (session, sink)
    }

    fn drain_programs(session: &mut TerminalSession) {
        for _ in 0..400 {
            session.pump();
            if session.running_programs() == 0 {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("programs did not finish");
    }

    #[test]
    fn boot_message_prints_banner_and_prompt() {
        let sink = Arc::new(MemorySink::new());
        let _session = TerminalSession::new(
            SessionConfig::new().with_user_name("u"),
            base_registry(),
            Arc::clone(&sink) as Arc<dyn PrintSink>,
        );
        let out = sink.contents_string();
        assert!(out.contains("Welcome to conch :)"));
        assert!(out.ends_with("u@conch>"));
        assert!(out.starts_with("\x1bc"));
    }

    #[test]
    fn typing_echoes_and_fills_buffer() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"hi");
        assert_eq!(session.current_line(), "hi");
        assert_eq!(session.cursor(), 2);
        assert_eq!(sink.contents_string(), "hi");
    }

    #[test]
    fn unknown_command_reports_not_found() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"frob\r");
        let out = sink.contents_string();
        assert!(out.contains(
            "\"frob\" is not a valid command. Type \"help\" to see a list of available ones"
        ));
        assert_eq!(session.current_line(), "");
    }

    #[test]
    fn empty_enter_reprints_prompt() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"\r");
        assert_eq!(sink.contents_string(), "\r\nu@conch>");
    }

    #[test]
    fn mid_buffer_insert_renders_tail() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"ac");
        session.process_buffer(b"\x1b[D");
        sink.take();
        session.process_buffer(b"b");
        assert_eq!(session.current_line(), "abc");
        assert_eq!(session.cursor(), 2);
        assert_eq!(sink.contents_string(), format!("{}bc{}", vt100::ERASE_LINE_END, vt100::cursor_back_by(1)));
    }

    #[test]
    fn backspace_at_end_rubs_out() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"ab");
        sink.take();
        session.process_buffer(&[0x08]);
        assert_eq!(session.current_line(), "a");
        assert_eq!(sink.contents_string(), "\x08 \x08");
    }

    #[test]
    fn backspace_mid_buffer_reprints_tail() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"abc\x1b[D");
        sink.take();
        session.process_buffer(&[0x7F]);
        assert_eq!(session.current_line(), "ac");
        assert_eq!(session.cursor(), 1);
        assert_eq!(
            sink.contents_string(),
            format!("\x08{}c{}", vt100::ERASE_LINE_END, vt100::cursor_back_by(1))
        );
    }

    #[test]
    fn buffer_overflow_rings_bell() {
        let sink = Arc::new(MemorySink::new());
        let mut session = TerminalSession::new(
            SessionConfig::new().with_user_name("u").with_input_capacity(2),
            base_registry(),
            Arc::clone(&sink) as Arc<dyn PrintSink>,
        );
        session.process_buffer(b"abc");
        assert_eq!(session.current_line(), "ab");
        assert!(sink.contents_string().ends_with(vt100::BELL));
    }

    #[test]
    fn ctrl_c_without_program_clears_line() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"half a line");
        sink.take();
        session.process_buffer(&[0x03]);
        assert_eq!(session.current_line(), "");
        assert_eq!(sink.contents_string(), "\n^C\r\nu@conch>");
    }

    #[test]
    fn history_preview_then_commit_on_edit() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"frob\r");
        drain_programs(&mut session);
        sink.take();
        // Up previews without touching the buffer.
        session.process_buffer(b"\x1b[A");
        assert_eq!(session.current_line(), "");
        let out = sink.take();
        assert!(String::from_utf8_lossy(&out).contains("u@conch>frob"));
        // Typing commits the preview, then inserts.
        session.process_buffer(b"!");
        assert_eq!(session.current_line(), "frob!");
    }

    #[test]
    fn history_exhaustion_rings_bell_and_keeps_line() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"frob\r");
        drain_programs(&mut session);
        session.process_buffer(b"\x1b[A");
        sink.take();
        session.process_buffer(b"\x1b[A");
        assert!(sink.contents_string().starts_with(vt100::BELL));
        assert_eq!(session.current_line(), "");
    }

    #[test]
    fn history_exhaustion_then_enter_submits_live_line() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"one\r");
        drain_programs(&mut session);
        session.process_buffer(b"he");
        // Browse past the oldest entry; the repaint shows the live line
        // again, and that is what Enter must submit.
        session.process_buffer(b"\x1b[A\x1b[A");
        sink.take();
        session.process_buffer(b"\r");
        let out = sink.contents_string();
        assert!(out.contains("\"he\" is not a valid command"));
        assert!(!out.contains("\"one\""));
    }

    #[test]
    fn tab_previews_and_second_tab_restores() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"he");
        sink.take();
        session.process_buffer(b"\t");
        // Preview shows the completion; buffer is untouched until commit.
        assert!(sink.take().ends_with(b"\ru@conch>help"));
        assert_eq!(session.current_line(), "he");
        session.process_buffer(b"\t");
        let out = sink.take();
        assert!(out.starts_with(vt100::BELL.as_bytes()));
        assert!(out.ends_with(b"\ru@conch>he"));
        assert_eq!(session.current_line(), "he");
    }

    #[test]
    fn tab_selection_commits_on_enter() {
        let (mut session, _sink) = new_session();
        session.process_buffer(b"he\t");
        // Enter commits "help" and dispatches it.
        session.process_buffer(b"\r");
        drain_programs(&mut session);
        session.process_buffer(b"\x1b[A");
        // The history holds the committed line.
        session.process_buffer(b" ");
        assert_eq!(session.current_line(), "help ");
    }

    #[test]
    fn back_tab_picks_last_candidate() {
        let (mut session, sink) = new_session();
        // Empty prefix matches every command; the registry sorts them as
        // cls, help, ls, and a backward cycle starts at the end.
        session.process_buffer(b"\x1b[Z");
        let out = sink.take();
        assert!(out.ends_with(b"\ru@conch>ls"));
    }

    #[test]
    fn dispatch_reports_completion() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"help\r");
        drain_programs(&mut session);
        let out = sink.contents_string();
        assert!(out.contains("Command help finished with code 255"));
        assert!(out.ends_with("\ru@conch>"));
    }

    #[test]
    fn unclosed_literal_aborts_dispatch() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"help \"oops\r");
        let out = sink.contents_string();
        assert!(out.contains("Error: unclosed string literal in command"));
        assert!(out.contains("Task returned with error code 0"));
        assert_eq!(session.running_programs(), 0);
    }

    #[test]
    fn line_feed_is_an_unknown_code() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"\n");
        assert_eq!(
            sink.contents_string(),
            "\r\nunknown code received: 0x0a\r\nu@conch>"
        );
    }

    #[test]
    fn unknown_code_redraws_the_edit_line() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"keep\x1b[D\x1b[D");
        sink.take();
        session.process_buffer(b"\n");
        assert_eq!(
            sink.contents_string(),
            format!(
                "\r\nunknown code received: 0x0a\r\nu@conch>keep{}",
                vt100::cursor_back_by(2)
            )
        );
        assert_eq!(session.current_line(), "keep");
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn reset_reprints_boot_message_with_buffer() {
        let (mut session, sink) = new_session();
        session.process_buffer(b"keep");
        sink.take();
        session.process_buffer(b"\x1bc");
        let out = sink.contents_string();
        assert!(out.starts_with("\x1bc"));
        assert!(out.ends_with("u@conch>keep"));
        assert_eq!(session.current_line(), "keep");
    }
}
