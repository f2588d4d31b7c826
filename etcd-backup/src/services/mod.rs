pub mod commands;

pub use commands::{execute_command, CommandOutput};
