#![forbid(unsafe_code)]

//! Session configuration.

/// Tunables for one [`crate::TerminalSession`].
///
/// Defaults size the session for a small serial console: a 128-byte input
/// line, 16 history slots, a 32-byte program input channel, and an 8-entry
/// control queue.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) shell_name: String,
    pub(crate) user_name: String,
    pub(crate) input_capacity: usize,
    pub(crate) history_slots: usize,
    pub(crate) byte_channel_bound: usize,
    pub(crate) control_channel_bound: usize,
    pub(crate) echo: bool,
    pub(crate) banner: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell_name: "conch".to_owned(),
            user_name: "user".to_owned(),
            input_capacity: 128,
            history_slots: 16,
            byte_channel_bound: 32,
            control_channel_bound: 8,
            echo: true,
            banner: "Welcome to conch :)".to_owned(),
        }
    }
}

impl SessionConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The device name shown after the `@` in the prompt.
    #[must_use]
    pub fn with_shell_name(mut self, name: impl Into<String>) -> Self {
        self.shell_name = name.into();
        self
    }

    /// The user name shown before the `@` in the prompt.
    #[must_use]
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    /// Edit-buffer capacity in bytes.
    #[must_use]
    pub fn with_input_capacity(mut self, bytes: usize) -> Self {
        self.input_capacity = bytes;
        self
    }

    /// Number of history ring slots.
    #[must_use]
    pub fn with_history_slots(mut self, slots: usize) -> Self {
        self.history_slots = slots;
        self
    }

    /// Bound of each program's private byte channel.
    #[must_use]
    pub fn with_byte_channel_bound(mut self, bound: usize) -> Self {
        self.byte_channel_bound = bound;
        self
    }

    /// Bound of each program's control-message queue.
    #[must_use]
    pub fn with_control_channel_bound(mut self, bound: usize) -> Self {
        self.control_channel_bound = bound;
        self
    }

    /// Whether keystrokes echo by default.
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Startup banner printed on session creation and terminal reset.
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }
}
