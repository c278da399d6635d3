//! Confirmation flows.
//!
//! [`Confirmation`] bundles a [`Console`], a [`PasswordPrompt`] and the
//! confirmation settings. Flows that must get an unambiguous answer loop
//! on validation errors but give up on I/O errors.

use std::io::{BufRead, Write};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::ConfirmConfig;
use crate::prompt::{Console, TerminalPasswordPrompt};
use crate::traits::{KeyRing, PasswordPrompt, PromptError};
use crate::types::KeyInfo;

/// Interactive confirmation flows.
///
/// The password prompt and the no-confirm switch are fixed at
/// construction, so tests can vary them per instance.
pub struct Confirmation<R, W, P = TerminalPasswordPrompt> {
    pub(crate) console: Console<R, W>,
    password_prompt: P,
    pub(crate) no_confirm: bool,
}

impl<R: BufRead, W: Write> Confirmation<R, W, TerminalPasswordPrompt> {
    /// Create confirmation flows that read secrets from the terminal.
    pub fn new(console: Console<R, W>, config: &ConfirmConfig) -> Self {
        Self::with_password_prompt(console, TerminalPasswordPrompt::new(), config)
    }
}

impl<R: BufRead, W: Write, P: PasswordPrompt> Confirmation<R, W, P> {
    /// Create confirmation flows with a custom secret source.
    pub fn with_password_prompt(console: Console<R, W>, password_prompt: P, config: &ConfirmConfig) -> Self {
        Self {
            console,
            password_prompt,
            no_confirm: config.no_confirm,
        }
    }

    /// Whether recipient confirmation is skipped.
    pub fn no_confirm(&self) -> bool {
        self.no_confirm
    }

    /// The underlying console.
    pub fn console(&mut self) -> &mut Console<R, W> {
        &mut self.console
    }

    /// Ask a yes/no question until the operator answers yes or no.
    ///
    /// Unrecognized answers re-ask; the default is no.
    ///
    /// # Errors
    ///
    /// Only console failures end the loop with an error.
    pub fn ask_for_confirmation(&mut self, text: &str) -> Result<bool, PromptError> {
        loop {
            match self.console.ask_for_bool(text, false) {
                Ok(choice) => return Ok(choice),
                Err(e) if e.is_validation() => {
                    debug!(error = %e, "Unrecognized answer, asking again");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Ask for a password twice until both entries match.
    ///
    /// Entries are compared after trimming surrounding whitespace and the
    /// trimmed value is returned. A mismatch repeats both reads.
    pub async fn ask_for_password(&mut self, name: &str) -> Result<SecretString, PromptError> {
        loop {
            let pass = self
                .password_prompt
                .prompt(&format!("Enter password for {}", name))
                .await?;
            let pass_again = self
                .password_prompt
                .prompt(&format!("Retype password for {}", name))
                .await?;

            let pass = pass.expose_secret().trim();
            if pass == pass_again.expose_secret().trim() {
                return Ok(SecretString::from(pass.to_string()));
            }

            debug!(entry = name, "Password entries did not match");
            self.console
                .write_line("Error: the entered passwords do not match")?;
        }
    }

    /// Ask whether a public key should be imported into the key ring.
    ///
    /// Any failure to get an answer counts as no.
    pub fn ask_for_key_import(&mut self, key: &str) -> bool {
        let question = format!(
            "Do you want to import the public key '{}' into your keyring?",
            key
        );
        match self.console.ask_for_bool(&question, false) {
            Ok(choice) => choice,
            Err(e) => {
                debug!(error = %e, "No usable answer to key import, declining");
                false
            }
        }
    }

    /// Let the operator pick one of the usable private keys.
    ///
    /// Returns the fingerprint of the chosen key. Answers that are not a
    /// number or out of range ask again.
    pub fn ask_for_private_key<K>(&mut self, keyring: &K, prompt: &str) -> Result<String, PromptError>
    where
        K: KeyRing + ?Sized,
    {
        let keys: Vec<KeyInfo> = keyring
            .list_private_keys()?
            .into_iter()
            .filter(|k| k.usable)
            .collect();
        if keys.is_empty() {
            return Err(PromptError::NoUsableKeys);
        }

        let question = format!("Please enter the number of a key (0-{})", keys.len() - 1);
        loop {
            self.console.write_line(prompt)?;
            for (i, key) in keys.iter().enumerate() {
                self.console.write_line(format_args!("[{}] {}", i, key.one_line()))?;
            }

            let choice = match self.console.ask_for_int(&question, 0) {
                Ok(choice) => choice,
                Err(e) if e.is_validation() => continue,
                Err(e) => return Err(e),
            };

            match usize::try_from(choice).ok().and_then(|i| keys.get(i)) {
                Some(key) => return Ok(key.fingerprint.clone()),
                None => debug!(choice = choice, "Key index out of range"),
            }
        }
    }
}
