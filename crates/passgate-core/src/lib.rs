//! Core building blocks for passgate.
//!
//! This crate holds the interactive side of a credential-management CLI:
//! everything that talks to the operator through the terminal, and the
//! clipboard guard that wipes a copied secret after a timeout.
//!
//! # Modules
//!
//! - [`prompt`]: Line and typed prompts, terminal secret entry, mock prompt
//! - [`confirm`]: Confirmation flows built on the prompt primitives
//! - [`recipients`]: Recipient confirmation before an encryption operation
//! - [`clipboard`]: Fingerprinting and the detached clipboard guard
//! - [`traits`]: Pluggable component traits (`PasswordPrompt`, `KeyRing`, `Clipboard`)
//! - [`types`]: Shared data types (`KeyInfo`)
//! - [`config`]: TOML configuration
//!
//! # Example
//!
//! ```
//! use passgate_core::prompt::Console;
//! use std::io::Cursor;
//!
//! let mut console = Console::new(Cursor::new("y\n"), Vec::new());
//! assert!(console.ask_for_bool("Proceed?", false).unwrap());
//! ```

pub mod clipboard;
pub mod config;
pub mod confirm;
pub mod prompt;
pub mod recipients;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root for convenience
pub use clipboard::{
    clear_clipboard, fingerprint, unclip, ClipboardGuard, MockClipboard, SystemClipboard,
    UnclipOutcome, CHECKSUM_ENV, UNCLIP_COMMAND,
};
pub use config::{Config, ConfigError};
pub use confirm::Confirmation;
pub use prompt::{Console, MockPasswordPrompt, TerminalPasswordPrompt, TerminalState};
pub use recipients::{MockKeyRing, RecipientsError};
pub use traits::{Clipboard, ClipboardError, KeyRing, KeyRingError, PasswordPrompt, PromptError};
pub use types::KeyInfo;
