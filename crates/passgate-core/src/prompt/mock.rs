//! Mock password prompt for testing.
//!
//! This module provides a scripted implementation of [`PasswordPrompt`]
//! that can stand in for the terminal in tests and non-interactive runs.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use secrecy::SecretString;

use crate::traits::{PasswordPrompt, PromptError};

/// A scripted password prompt.
///
/// Each call pops the next scripted answer. Once the script is exhausted
/// every call fails with `PromptError::UnexpectedEof`, the same way a
/// closed terminal would.
///
/// # Example
///
/// ```
/// use passgate_core::prompt::MockPasswordPrompt;
///
/// // Two matching entries
/// let mock = MockPasswordPrompt::with_responses(["secret", "secret"]);
///
/// // A prompt that fails on first use
/// let broken = MockPasswordPrompt::closed();
/// ```
pub struct MockPasswordPrompt {
    /// Remaining answers.
    responses: Mutex<VecDeque<String>>,
    /// Labels the prompt was called with, in order.
    prompts: Mutex<Vec<String>>,
    /// Number of times prompt was called.
    call_count: Arc<AtomicUsize>,
}

impl MockPasswordPrompt {
    /// Create a mock that answers with the given secrets in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock whose input is already closed.
    pub fn closed() -> Self {
        Self::with_responses(Vec::<String>::new())
    }

    /// Get the number of times prompt was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get a clone of the call counter for external tracking.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    /// Labels seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Default for MockPasswordPrompt {
    fn default() -> Self {
        Self::with_responses(["mock-password"])
    }
}

impl PasswordPrompt for MockPasswordPrompt {
    fn prompt<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SecretString, PromptError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(text.to_string());
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());

        Box::pin(async move { next.map(SecretString::from).ok_or(PromptError::UnexpectedEof) })
    }
}
