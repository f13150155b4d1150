//! Chat glue: turns chat lines into `tts` commands for the dispatcher.
//!
//! No chat protocol is spoken here; lines come from a console stream.

mod command;
mod console;

pub use console::ConsoleChat;
