#![forbid(unsafe_code)]

//! Host-agnostic command-line shell engine.
//!
//! `conch-core` is the platform-independent heart of conch. It owns escape
//! decoding, line editing, history, autocompletion, command dispatch, and
//! program job control, with no host I/O of its own.
//!
//! # Primary responsibilities
//!
//! - **Decoder**: VT100 escape-sequence state machine turning raw bytes into
//!   key events.
//! - **Buffer**: the edit line, with cursor-aware insert and delete.
//! - **History**: ring of previously submitted lines with preview-style
//!   browsing.
//! - **Autocomplete**: candidate cycling over command names or per-command
//!   providers.
//! - **Registry**: sorted command table mapping names to entry functions.
//! - **Program**: spawned command workers and the channel protocol they use
//!   to talk to the session.
//! - **Session**: the event loop tying all of the above together.
//!
//! # Design principles
//!
//! - **No I/O**: the host feeds bytes in and supplies a [`PrintSink`] for
//!   bytes going out.
//! - **Single-threaded core**: all shell state is mutated from the session
//!   only; programs communicate exclusively through channels.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod autocomplete;
pub mod buffer;
pub mod config;
pub mod decoder;
pub mod event;
pub mod history;
pub mod logging;
pub mod print;
pub mod program;
pub mod registry;
pub mod session;
pub mod tokenizer;
pub mod vt100;

pub use autocomplete::{
    CompletionProvider, CompletionQuery, Completions, WordListCompleter, command_name_matches,
    quoted,
};
pub use buffer::{EditBuffer, EditError};
pub use config::SessionConfig;
pub use decoder::{KeyDecoder, MAX_CSI_PARAMS};
pub use event::{Direction, KeyEvent};
pub use history::HistoryRing;
pub use print::{ErrorPrinter, MemorySink, PrintSink, ReportContext, default_error_printer};
pub use program::{ExitCode, InputMode, ProgramArgs, ProgramContext, ReadError, SpawnError};
pub use registry::{
    CommandDescriptor, CommandFn, CommandRegistry, DEFAULT_REGISTRY_CAPACITY, RegistryError,
};
pub use session::TerminalSession;
pub use tokenizer::{TokenizeError, count_tokens, split_tokens, token_spans};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};
