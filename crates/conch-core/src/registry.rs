#![forbid(unsafe_code)]

//! Command registry.
//!
//! An owned vector of command descriptors kept sorted under a
//! case-insensitive comparator. Mutation only happens during startup
//! registration; afterwards the registry is shared read-only behind an `Arc`.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::autocomplete::CompletionProvider;
use crate::program::{ExitCode, ProgramArgs, ProgramContext};

/// Registry capacity used by [`CommandRegistry::new`].
pub const DEFAULT_REGISTRY_CAPACITY: usize = 255;

/// A command entry point.
///
/// Runs on the program's worker thread; `args` token 0 is the command word.
pub type CommandFn = fn(&mut ProgramContext, &ProgramArgs) -> ExitCode;

/// Errors from command registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry is at capacity; the command was not inserted.
    Full,
    /// The name was already registered. Warning-grade: the new entry is
    /// inserted anyway and shadows the old one.
    Duplicate {
        /// The name registered twice.
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Full => write!(f, "command registry is full"),
            RegistryError::Duplicate { name } => {
                write!(f, "command \"{name}\" is already registered")
            }
        }
    }
}

impl Error for RegistryError {}

/// One registered command, immutable after registration.
pub struct CommandDescriptor {
    name: String,
    description: String,
    entry: CommandFn,
    completer: Option<Arc<dyn CompletionProvider>>,
    stack_size: usize,
}

impl CommandDescriptor {
    /// Describe a command.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        entry: CommandFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            entry,
            completer: None,
            stack_size: 0,
        }
    }

    /// Attach a completion provider consulted instead of the default
    /// command-name matcher.
    #[must_use]
    pub fn with_completer(mut self, completer: Arc<dyn CompletionProvider>) -> Self {
        self.completer = Some(completer);
        self
    }

    /// Hint the worker thread stack size in bytes (0 = host default).
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// The command word this descriptor answers to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description shown by `help`.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn entry(&self) -> CommandFn {
        self.entry
    }

    pub(crate) fn completer(&self) -> Option<&Arc<dyn CompletionProvider>> {
        self.completer.as_ref()
    }

    pub(crate) fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("stack_size", &self.stack_size)
            .field("has_completer", &self.completer.is_some())
            .finish()
    }
}

/// Sorted command table.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDescriptor>>,
    capacity: usize,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Create a registry with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REGISTRY_CAPACITY)
    }

    /// Create a registry holding at most `capacity` commands.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::new(),
            capacity,
        }
    }

    /// Insert a descriptor at its sorted position.
    ///
    /// A duplicate name is still inserted (ahead of the existing entry, so
    /// the newest registration shadows) but reported as
    /// [`RegistryError::Duplicate`].
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if self.commands.len() >= self.capacity {
            crate::warn!(name = descriptor.name(), "command registry full");
            return Err(RegistryError::Full);
        }
        let duplicate = self
            .commands
            .iter()
            .any(|cmd| cmd.name() == descriptor.name());
        let pos = self
            .commands
            .iter()
            .position(|cmd| cmp_names(descriptor.name(), cmd.name()) != Ordering::Greater)
            .unwrap_or(self.commands.len());
        let name = descriptor.name().to_owned();
        self.commands.insert(pos, Arc::new(descriptor));
        if duplicate {
            crate::warn!(name = %name, "duplicate command name, newest entry shadows");
            return Err(RegistryError::Duplicate { name });
        }
        Ok(())
    }

    /// Resolve the command a line names.
    ///
    /// The command token is everything before the first space; matching is
    /// exact and case-sensitive.
    #[must_use]
    pub fn find(&self, line: &str) -> Option<Arc<CommandDescriptor>> {
        let token = line.find(' ').map_or(line, |i| &line[..i]);
        self.commands.iter().find(|cmd| cmd.name() == token).cloned()
    }

    /// Iterate descriptors in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.commands.iter()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Case-fold one character for ordering. ASCII letters lowercase, plus the
/// three German umlauts.
fn fold(c: char) -> char {
    match c {
        'Ü' => 'ü',
        'Ä' => 'ä',
        'Ö' => 'ö',
        _ => c.to_ascii_lowercase(),
    }
}

/// Registry ordering: case-insensitive lexicographic, shorter name first on a
/// full prefix tie.
fn cmp_names(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        let ord = fold(ca).cmp(&fold(cb));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.chars().count().cmp(&b.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
        ExitCode::Success
    }

    fn registry_with(names: &[&str]) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for name in names {
            registry
                .register(CommandDescriptor::new(*name, "", noop))
                .unwrap();
        }
        registry
    }

    fn names(registry: &CommandRegistry) -> Vec<String> {
        registry.iter().map(|cmd| cmd.name().to_owned()).collect()
    }

    #[test]
    fn insertion_keeps_sorted_order() {
        let registry = registry_with(&["help", "cls", "ls", "cd"]);
        assert_eq!(names(&registry), ["cd", "cls", "help", "ls"]);
    }

    #[test]
    fn ordering_is_case_insensitive() {
        let registry = registry_with(&["Beta", "alpha", "GAMMA"]);
        assert_eq!(names(&registry), ["alpha", "Beta", "GAMMA"]);
    }

    #[test]
    fn shorter_name_wins_prefix_tie() {
        let registry = registry_with(&["help", "he"]);
        assert_eq!(names(&registry), ["he", "help"]);
    }

    #[test]
    fn duplicate_is_inserted_but_reported() {
        let mut registry = registry_with(&["top"]);
        let result = registry.register(CommandDescriptor::new("top", "newer", noop));
        assert_eq!(
            result,
            Err(RegistryError::Duplicate {
                name: "top".to_owned()
            })
        );
        assert_eq!(registry.len(), 2);
        // The newest registration shadows the old one.
        let found = registry.find("top").unwrap();
        assert_eq!(found.description(), "newer");
    }

    #[test]
    fn full_registry_rejects() {
        let mut registry = CommandRegistry::with_capacity(1);
        registry
            .register(CommandDescriptor::new("a", "", noop))
            .unwrap();
        let result = registry.register(CommandDescriptor::new("b", "", noop));
        assert_eq!(result, Err(RegistryError::Full));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn find_matches_token_before_space() {
        let registry = registry_with(&["echo", "help"]);
        assert_eq!(registry.find("echo hi there").unwrap().name(), "echo");
        assert_eq!(registry.find("echo").unwrap().name(), "echo");
        assert!(registry.find("echoes").is_none());
    }

    #[test]
    fn find_is_case_sensitive() {
        let registry = registry_with(&["echo"]);
        assert!(registry.find("Echo").is_none());
    }

    #[test]
    fn accented_letters_fold() {
        assert_eq!(cmp_names("Über", "über"), Ordering::Equal);
        assert_eq!(cmp_names("Ärger", "ärger"), Ordering::Equal);
    }
}
