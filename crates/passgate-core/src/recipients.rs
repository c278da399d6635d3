//! Recipient confirmation.
//!
//! Before a secret is encrypted the operator is shown who will be able to
//! read it and asked to approve. Lookup problems for single recipients are
//! reported but do not block the question; the returned list is never
//! filtered.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::confirm::Confirmation;
use crate::traits::{KeyRing, KeyRingError, PasswordPrompt, PromptError};
use crate::types::KeyInfo;

/// Error returned when recipients were not approved.
///
/// Both variants carry the recipient list so the caller can report it,
/// but any error means the encryption must not go ahead.
#[derive(Debug, thiserror::Error)]
pub enum RecipientsError {
    /// The operator declined.
    #[error("user aborted")]
    Aborted {
        /// The recipients that were shown.
        recipients: Vec<String>,
    },

    /// No answer could be read.
    #[error("failed to confirm recipients: {source}")]
    Prompt {
        /// The console failure.
        #[source]
        source: PromptError,
        /// The recipients that were shown.
        recipients: Vec<String>,
    },
}

impl RecipientsError {
    /// The recipient list the confirmation was asked for.
    pub fn recipients(&self) -> &[String] {
        match self {
            RecipientsError::Aborted { recipients } => recipients,
            RecipientsError::Prompt { recipients, .. } => recipients,
        }
    }

    /// Whether the operator explicitly said no.
    pub fn is_aborted(&self) -> bool {
        matches!(self, RecipientsError::Aborted { .. })
    }
}

impl<R: BufRead, W: Write, P: PasswordPrompt> Confirmation<R, W, P> {
    /// Ask the operator to approve the recipients of `name`.
    ///
    /// With no-confirm enabled the list is returned untouched without any
    /// output or input. Otherwise the list is sorted, every recipient is
    /// looked up and shown, and a single yes/no question defaulting to yes
    /// is asked. On approval the sorted list is returned with nothing
    /// removed, including recipients whose lookup failed.
    pub fn confirm_recipients<K>(
        &mut self,
        keyring: &K,
        name: &str,
        mut recipients: Vec<String>,
    ) -> Result<Vec<String>, RecipientsError>
    where
        K: KeyRing + ?Sized,
    {
        if self.no_confirm {
            debug!(entry = name, count = recipients.len(), "Skipping recipient confirmation");
            return Ok(recipients);
        }

        recipients.sort();
        match self.review_recipients(keyring, name, &recipients) {
            Ok(true) => Ok(recipients),
            Ok(false) => {
                debug!(entry = name, "Recipients declined");
                Err(RecipientsError::Aborted { recipients })
            }
            Err(source) => Err(RecipientsError::Prompt { source, recipients }),
        }
    }

    fn review_recipients<K>(
        &mut self,
        keyring: &K,
        name: &str,
        recipients: &[String],
    ) -> Result<bool, PromptError>
    where
        K: KeyRing + ?Sized,
    {
        self.console
            .write_line(format_args!("Encrypting {} for these recipients:", name))?;
        for recipient in recipients {
            match keyring.list_public_keys(recipient) {
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Recipient lookup failed");
                    self.console.write_line(&e)?;
                }
                Ok(keys) => match keys.first() {
                    Some(key) => self.console.write_line(format_args!(" - {}", key.one_line()))?,
                    None => self
                        .console
                        .write_line(format_args!("key not found {}", recipient))?,
                },
            }
        }
        self.console.write_line("")?;

        self.console.ask_for_bool("Do you want to continue?", true)
    }
}

/// A fixed in-memory key ring for testing.
///
/// # Example
///
/// ```
/// use passgate_core::recipients::MockKeyRing;
/// use passgate_core::traits::KeyRing;
/// use passgate_core::types::KeyInfo;
///
/// let keyring = MockKeyRing::new()
///     .with_public_key("alice@example.com", KeyInfo::new("ABCDEF0123456789", "Alice"));
///
/// assert_eq!(keyring.list_public_keys("alice@example.com").unwrap().len(), 1);
/// assert!(keyring.list_public_keys("nobody").unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockKeyRing {
    public: HashMap<String, Vec<KeyInfo>>,
    public_errors: HashMap<String, String>,
    private: Vec<KeyInfo>,
    private_error: Option<String>,
}

impl MockKeyRing {
    /// Create an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a public key found under `id`.
    pub fn with_public_key(mut self, id: impl Into<String>, key: KeyInfo) -> Self {
        self.public.entry(id.into()).or_default().push(key);
        self
    }

    /// Make lookups of `id` fail with `message`.
    pub fn failing_public_key(mut self, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.public_errors.insert(id.into(), message.into());
        self
    }

    /// Set the private keys.
    pub fn with_private_keys(mut self, keys: Vec<KeyInfo>) -> Self {
        self.private = keys;
        self
    }

    /// Make private key listing fail with `message`.
    pub fn failing_private_keys(mut self, message: impl Into<String>) -> Self {
        self.private_error = Some(message.into());
        self
    }
}

impl KeyRing for MockKeyRing {
    fn list_public_keys(&self, id: &str) -> Result<Vec<KeyInfo>, KeyRingError> {
        if let Some(message) = self.public_errors.get(id) {
            return Err(KeyRingError::Backend(message.clone()));
        }
        Ok(self.public.get(id).cloned().unwrap_or_default())
    }

    fn list_private_keys(&self) -> Result<Vec<KeyInfo>, KeyRingError> {
        match &self.private_error {
            Some(message) => Err(KeyRingError::Backend(message.clone())),
            None => Ok(self.private.clone()),
        }
    }
}
