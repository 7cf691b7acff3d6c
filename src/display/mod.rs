// src/display/mod.rs
//! Display front-ends for the mission panels

pub mod terminal;

pub use terminal::TerminalDisplay;

/// Check if stdout is attached to an interactive terminal
pub fn is_interactive() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
