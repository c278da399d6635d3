//! Prompt implementations.
//!
//! - [`Console`]: line, yes/no and integer prompts over any reader/writer pair
//! - [`TerminalPasswordPrompt`]: secret entry on the controlling terminal (production)
//! - [`MockPasswordPrompt`]: scripted secrets for testing
//!
//! The two secret prompts implement the [`PasswordPrompt`](crate::traits::PasswordPrompt) trait.

mod line;
mod mock;
mod terminal;

pub use line::Console;
pub use mock::MockPasswordPrompt;
pub use terminal::{TerminalPasswordPrompt, TerminalState};
