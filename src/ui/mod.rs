pub mod cli;
pub mod labels;

#[cfg(test)]
mod tests;

pub use cli::{parse_command, Args, Cli, UiCommand};
pub use labels::Labels;
