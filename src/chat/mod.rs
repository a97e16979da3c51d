//! Chat command surface: text parsing and the per-session registry that applies
//! parsed commands to persisted game sessions.

pub mod command;
pub mod registry;

pub use command::{Command, CommandParser, HELP_TEXT};
pub use registry::SessionRegistry;
