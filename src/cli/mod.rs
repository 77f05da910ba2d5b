mod args;
mod command;

pub use args::Cli;
pub use command::{Command, ServeArgs};

pub use args::parse;
