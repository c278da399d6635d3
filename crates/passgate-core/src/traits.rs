//! Trait definitions for pluggable components.
//!
//! These traits define the interfaces for:
//! - Secret entry (terminal vs scripted)
//! - Key listing (gpg or a fixed key set)
//! - Clipboard access (system clipboard vs in-memory)
//!
//! The confirmation flows are written against these traits so they can be
//! driven without a terminal, a keyring or a display server in tests.

use std::future::Future;
use std::pin::Pin;

use secrecy::SecretString;

use crate::types::KeyInfo;

/// Error type for prompt operations.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Reading from or writing to the console failed.
    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The input stream was closed before a line was read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The terminal state could not be read or changed.
    #[error("could not get state of terminal: {0}")]
    Terminal(#[source] std::io::Error),

    /// The answer to a yes/no question was neither yes nor no.
    #[error("unknown answer: {0}")]
    UnknownAnswer(String),

    /// The answer to a numeric question was not an integer.
    #[error("invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    /// No usable private key was available for selection.
    #[error("no usable private keys found")]
    NoUsableKeys,

    /// The key ring could not be queried.
    #[error(transparent)]
    KeyRing(#[from] KeyRingError),

    /// The blocking read task failed.
    #[error("prompt task failed: {0}")]
    Task(String),
}

impl PromptError {
    /// Whether this error came from an unparseable answer rather than from
    /// the console itself. Prompt loops re-ask on these and give up on the rest.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PromptError::UnknownAnswer(_) | PromptError::InvalidNumber(_)
        )
    }
}

/// Error type for key ring operations.
#[derive(Debug, thiserror::Error)]
pub enum KeyRingError {
    /// The key ring backend could not be started.
    #[error("failed to run key ring backend: {0}")]
    Io(#[from] std::io::Error),

    /// The backend ran but reported a failure.
    #[error("key listing failed: {0}")]
    Backend(String),
}

/// Error type for clipboard operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The system clipboard could not be opened or accessed.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// The path of the running executable could not be determined.
    #[error("failed to locate current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    /// The watcher process could not be started.
    #[error("failed to spawn clipboard watcher: {0}")]
    Spawn(#[source] std::io::Error),

    /// The watcher was started without a checksum to compare against.
    #[error("missing checksum, {0} is not set")]
    MissingChecksum(&'static str),
}

/// Trait for secret entry implementations.
///
/// This trait abstracts where a secret comes from, allowing:
/// - Terminal input with echo disabled (production)
/// - Scripted answers for tests and non-interactive use
///
/// # Example (Scripted Implementation)
///
/// ```ignore
/// struct Fixed(&'static str);
///
/// impl PasswordPrompt for Fixed {
///     fn prompt<'a>(&'a self, _text: &'a str) -> Pin<Box<...>> {
///         Box::pin(async move { Ok(SecretString::from(self.0)) })
///     }
/// }
/// ```
pub trait PasswordPrompt: Send + Sync {
    /// Ask for a secret once.
    ///
    /// `text` is the label shown to the operator, without trailing colon.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::Terminal` if the terminal cannot be prepared.
    /// Returns `PromptError::Io` if reading the secret fails.
    fn prompt<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SecretString, PromptError>> + Send + 'a>>;
}

/// Trait for key listing backends.
///
/// Implementations must return an empty list, not an error, when a lookup
/// simply finds nothing.
pub trait KeyRing {
    /// List public keys matching `id` (fingerprint, key ID or user ID).
    fn list_public_keys(&self, id: &str) -> Result<Vec<KeyInfo>, KeyRingError>;

    /// List all private keys.
    fn list_private_keys(&self) -> Result<Vec<KeyInfo>, KeyRingError>;
}

/// Trait for clipboard access.
pub trait Clipboard {
    /// Current text contents, or `None` if the clipboard holds no text.
    fn get_contents(&mut self) -> Result<Option<String>, ClipboardError>;

    /// Replace the clipboard contents.
    fn set_contents(&mut self, text: &str) -> Result<(), ClipboardError>;

    /// Empty the clipboard.
    fn clear(&mut self) -> Result<(), ClipboardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_error_display() {
        assert_eq!(
            PromptError::UnknownAnswer("maybe".to_string()).to_string(),
            "unknown answer: maybe"
        );
        assert_eq!(
            PromptError::UnexpectedEof.to_string(),
            "unexpected end of input"
        );
        assert_eq!(
            PromptError::NoUsableKeys.to_string(),
            "no usable private keys found"
        );
    }

    #[test]
    fn validation_errors_are_retryable() {
        let parse_err = "abc".parse::<i64>().unwrap_err();
        assert!(PromptError::InvalidNumber(parse_err).is_validation());
        assert!(PromptError::UnknownAnswer("x".to_string()).is_validation());
    }

    #[test]
    fn io_errors_are_not_retryable() {
        assert!(!PromptError::UnexpectedEof.is_validation());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(!PromptError::Io(io).is_validation());
        assert!(!PromptError::NoUsableKeys.is_validation());
    }

    #[test]
    fn clipboard_error_display() {
        assert_eq!(
            ClipboardError::MissingChecksum("PASSGATE_UNCLIP_CHECKSUM").to_string(),
            "missing checksum, PASSGATE_UNCLIP_CHECKSUM is not set"
        );
    }
}
