#![forbid(unsafe_code)]

//! The demo's command set.
//!
//! Each command is an ordinary function handed to the registry; the engine
//! runs it on its own worker thread with the terminal in the foreground.

use std::sync::Arc;
use std::time::Duration;

use conch_core::vt100;
use conch_core::{
    CommandDescriptor, ExitCode, ProgramArgs, ProgramContext, ReadError, WordListCompleter,
};

pub const BANNER: &str = "conch interactive demo\r\nCtrl-D quits; try \"help\".";

pub fn all() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::new("help", "list every command with its description", help),
        CommandDescriptor::new("cls", "clear the screen and reprint the banner", cls),
        CommandDescriptor::new("echo", "print the arguments back", echo).with_completer(Arc::new(
            WordListCompleter::new(["hello", "lorem ipsum dolor", "world"]),
        )),
        CommandDescriptor::new("greet", "ask for a name and say hello", greet),
        CommandDescriptor::new("ticker", "print ticks until q or Ctrl-C", ticker),
    ]
}

fn help(ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
    let width = ctx
        .registry()
        .iter()
        .map(|cmd| cmd.name().len())
        .max()
        .unwrap_or(0);
    ctx.print("\r\n");
    for cmd in ctx.registry().iter() {
        ctx.print(&format!(
            "  {:<width$}  {}\r\n",
            cmd.name(),
            cmd.description()
        ));
    }
    ExitCode::Success
}

fn cls(ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
    ctx.print(vt100::CLEAR_SCREEN);
    ctx.print(&format!("{BANNER}\r\n"));
    ExitCode::Success
}

fn echo(ctx: &mut ProgramContext, args: &ProgramArgs) -> ExitCode {
    let text = args.rest().collect::<Vec<_>>().join(" ");
    ctx.print(&format!("{text}\r\n"));
    ExitCode::Success
}

fn greet(ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
    ctx.print("What is your name?\r\n");
    match ctx.read_line(Some(Duration::from_secs(60))) {
        Ok(name) if name.is_empty() => {
            ctx.print("Hello, whoever you are.\r\n");
            ExitCode::Success
        }
        Ok(name) => {
            ctx.print(&format!("Hello, {name}!\r\n"));
            ExitCode::Success
        }
        Err(ReadError::Interrupted) => {
            ctx.print("\r\nNever mind.\r\n");
            ExitCode::Success
        }
        Err(_) => ExitCode::Error,
    }
}

fn ticker(ctx: &mut ProgramContext, _args: &ProgramArgs) -> ExitCode {
    ctx.print("ticking; q or Ctrl-C stops\r\n");
    let mut n = 0u64;
    loop {
        match ctx.read_byte(Some(Duration::from_secs(1))) {
            Ok(0x03 | b'q') => return ExitCode::Success,
            Ok(_) => {}
            Err(ReadError::TimedOut) => {
                n += 1;
                ctx.print(&format!("tick {n}\r\n"));
            }
            Err(_) => return ExitCode::Error,
        }
    }
}
