//! Self-clearing clipboard.
//!
//! After a secret is copied, [`clear_clipboard`] re-executes the current
//! binary as `unclip --timeout <secs>` in its own process group. The child
//! receives the SHA-256 of the copied bytes through [`CHECKSUM_ENV`], never
//! the secret itself, so the parent can exit right away.
//!
//! When the timeout elapses the child reads the clipboard and clears it
//! only if the content still hashes to the same value. Anything the
//! operator copied in the meantime is left alone.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::traits::{Clipboard, ClipboardError};

/// Environment variable carrying the fingerprint to the watcher process.
pub const CHECKSUM_ENV: &str = "PASSGATE_UNCLIP_CHECKSUM";

/// Subcommand the watcher process is started with.
pub const UNCLIP_COMMAND: &str = "unclip";

/// Length of the fingerprint prefix written to logs.
const LOGGED_PREFIX_LEN: usize = 8;

/// Lowercase hex SHA-256 of `content`.
///
/// ```
/// let fpr = passgate_core::clipboard::fingerprint(b"");
/// assert_eq!(fpr, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
/// ```
pub fn fingerprint(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// What the watcher did when its timeout elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnclipOutcome {
    /// The clipboard still held the copied secret and was emptied.
    Cleared,
    /// The clipboard held something else (or nothing) and was left as is.
    Changed,
}

/// A fingerprint and the time after which matching content is cleared.
#[derive(Clone, PartialEq, Eq)]
pub struct ClipboardGuard {
    checksum: String,
    timeout: Duration,
}

impl ClipboardGuard {
    /// Guard the given clipboard content.
    pub fn new(content: &[u8], timeout: Duration) -> Self {
        Self::from_checksum(fingerprint(content), timeout)
    }

    /// Guard content known only by its fingerprint.
    pub fn from_checksum(checksum: impl Into<String>, timeout: Duration) -> Self {
        Self {
            checksum: checksum.into().trim().to_ascii_lowercase(),
            timeout,
        }
    }

    /// Rebuild the guard inside the watcher process from [`CHECKSUM_ENV`].
    ///
    /// # Errors
    ///
    /// `ClipboardError::MissingChecksum` if the variable is unset or empty.
    pub fn from_env(timeout: Duration) -> Result<Self, ClipboardError> {
        Self::from_var(std::env::var(CHECKSUM_ENV).ok(), timeout)
    }

    fn from_var(value: Option<String>, timeout: Duration) -> Result<Self, ClipboardError> {
        match value {
            Some(checksum) if !checksum.trim().is_empty() => {
                Ok(Self::from_checksum(checksum, timeout))
            }
            _ => Err(ClipboardError::MissingChecksum(CHECKSUM_ENV)),
        }
    }

    /// The guarded fingerprint.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// How long the watcher waits before checking the clipboard.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn short_checksum(&self) -> &str {
        self.checksum
            .get(..LOGGED_PREFIX_LEN)
            .unwrap_or(&self.checksum)
    }

    /// Whether `content` is exactly the guarded content.
    pub fn matches(&self, content: &str) -> bool {
        fingerprint(content.as_bytes()) == self.checksum
    }

    /// Build the detached watcher command for `exe`.
    ///
    /// The fingerprint travels in the environment so it does not show up
    /// in the argument list.
    pub fn command(&self, exe: &Path) -> Command {
        use std::os::unix::process::CommandExt;

        let mut cmd = Command::new(exe);
        cmd.arg(UNCLIP_COMMAND)
            .arg("--timeout")
            .arg(self.timeout.as_secs().to_string())
            .env(CHECKSUM_ENV, &self.checksum)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);
        cmd
    }

    /// Start the watcher and return without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `ClipboardError::CurrentExe` if the running binary cannot be
    /// located and `ClipboardError::Spawn` if the child does not start.
    /// Nothing is retried.
    pub fn spawn(&self) -> Result<(), ClipboardError> {
        let exe = std::env::current_exe().map_err(ClipboardError::CurrentExe)?;
        let child = self.command(&exe).spawn().map_err(ClipboardError::Spawn)?;

        debug!(
            pid = child.id(),
            checksum = self.short_checksum(),
            timeout_secs = self.timeout.as_secs(),
            "Spawned clipboard watcher"
        );
        Ok(())
    }

    /// Clear the clipboard if it still holds the guarded content.
    ///
    /// A clipboard that is empty, holds no text or cannot be read counts as
    /// changed.
    pub fn clear_if_unchanged<C>(&self, clipboard: &mut C) -> Result<UnclipOutcome, ClipboardError>
    where
        C: Clipboard + ?Sized,
    {
        let current = match clipboard.get_contents() {
            Ok(current) => current.map(Zeroizing::new),
            Err(e) => {
                warn!(error = %e, "Could not read clipboard, leaving it alone");
                return Ok(UnclipOutcome::Changed);
            }
        };

        match current {
            Some(content) if self.matches(&content) => {
                clipboard.clear()?;
                debug!(checksum = self.short_checksum(), "Cleared clipboard");
                Ok(UnclipOutcome::Cleared)
            }
            _ => {
                debug!(checksum = self.short_checksum(), "Clipboard changed, not clearing");
                Ok(UnclipOutcome::Changed)
            }
        }
    }

    /// Sleep for the timeout, then [`clear_if_unchanged`](Self::clear_if_unchanged).
    pub async fn watch<C>(&self, clipboard: &mut C) -> Result<UnclipOutcome, ClipboardError>
    where
        C: Clipboard + ?Sized,
    {
        tokio::time::sleep(self.timeout).await;
        self.clear_if_unchanged(clipboard)
    }
}

impl fmt::Debug for ClipboardGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardGuard")
            .field("checksum", &self.short_checksum())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Arrange for `content` to be removed from the clipboard after
/// `timeout_secs` seconds.
///
/// Returns as soon as the watcher process has started.
pub fn clear_clipboard(content: &[u8], timeout_secs: u64) -> Result<(), ClipboardError> {
    ClipboardGuard::new(content, Duration::from_secs(timeout_secs)).spawn()
}

/// Watcher side of the protocol: wait, then clear on a fingerprint match.
pub async fn unclip<C>(
    clipboard: &mut C,
    checksum: &str,
    timeout: Duration,
) -> Result<UnclipOutcome, ClipboardError>
where
    C: Clipboard + ?Sized,
{
    ClipboardGuard::from_checksum(checksum, timeout)
        .watch(clipboard)
        .await
}

/// The desktop clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// Connect to the desktop clipboard.
    pub fn new() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl Clipboard for SystemClipboard {
    fn get_contents(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipboardError::Unavailable(e.to_string())),
        }
    }

    fn set_contents(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text)
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.inner
            .clear()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// In-memory clipboard for testing.
///
/// Clones share the same contents, so a test can hand one clone to the
/// code under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MockClipboard {
    contents: Arc<Mutex<Option<String>>>,
    unreadable: bool,
}

impl MockClipboard {
    /// An empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard holding `text`.
    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(text.into()))),
            unreadable: false,
        }
    }

    /// A clipboard whose reads always fail.
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::default()
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, ClipboardError> {
        self.contents
            .lock()
            .map_err(|_| ClipboardError::Unavailable("mock clipboard lock poisoned".to_string()))
    }
}

impl Clipboard for MockClipboard {
    fn get_contents(&mut self) -> Result<Option<String>, ClipboardError> {
        if self.unreadable {
            return Err(ClipboardError::Unavailable("no display".to_string()));
        }
        Ok(self.lock()?.clone())
    }

    fn set_contents(&mut self, text: &str) -> Result<(), ClipboardError> {
        *self.lock()? = Some(text.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        *self.lock()? = None;
        Ok(())
    }
}
