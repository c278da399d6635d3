//! Core types for passgate.
//!
//! Key records are produced by a [`KeyRing`](crate::traits::KeyRing)
//! implementation and are read-only from the point of view of the prompts.

/// A public or private key as reported by the key ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Full hex fingerprint of the primary key.
    pub fingerprint: String,
    /// Primary user ID (e.g. `Alice <alice@example.com>`).
    pub user_id: String,
    /// Whether the key can be used (not expired, revoked or disabled).
    pub usable: bool,
}

impl KeyInfo {
    /// Create a new usable key record.
    pub fn new(fingerprint: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            user_id: user_id.into(),
            usable: true,
        }
    }

    /// Mark the key as unusable.
    pub fn unusable(mut self) -> Self {
        self.usable = false;
        self
    }

    /// The long key ID: the last 16 hex digits of the fingerprint.
    pub fn key_id(&self) -> &str {
        let start = self.fingerprint.len().saturating_sub(16);
        self.fingerprint.get(start..).unwrap_or(&self.fingerprint)
    }

    /// One-line display form used in recipient lists and key pickers.
    ///
    /// # Examples
    ///
    /// ```
    /// use passgate_core::types::KeyInfo;
    ///
    /// let key = KeyInfo::new("4E2C8F1A0B9D7E6F5A4B3C2D1E0F9A8B7C6D5E4F", "Alice <alice@example.com>");
    /// assert_eq!(key.one_line(), "0x1E0F9A8B7C6D5E4F - Alice <alice@example.com>");
    /// ```
    pub fn one_line(&self) -> String {
        format!("0x{} - {}", self.key_id(), self.user_id)
    }
}

impl std::fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.one_line())
    }
}
