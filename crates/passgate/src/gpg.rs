//! Key ring backed by the `gpg` command line tool.
//!
//! Keys are listed with `--with-colons` and parsed from the machine
//! readable records. Only the primary key's fingerprint and first user ID
//! are kept.

use std::process::Command;

use passgate_core::{KeyInfo, KeyRing, KeyRingError};
use tracing::{debug, trace};

/// Validity flags marking a key as unusable: expired, revoked, invalid,
/// disabled.
const UNUSABLE_VALIDITY: &[char] = &['e', 'r', 'i', 'd'];

/// Stderr fragments gpg prints when a lookup finds nothing.
const NOT_FOUND_MARKERS: &[&str] = &["No public key", "No secret key"];

/// [`KeyRing`] that shells out to gpg.
#[derive(Debug, Clone)]
pub struct GpgKeyRing {
    binary: String,
}

impl GpgKeyRing {
    /// Use the given gpg executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn list(&self, mode: &str, id: Option<&str>) -> Result<Vec<KeyInfo>, KeyRingError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--batch", "--with-colons", "--fingerprint", mode]);
        if let Some(id) = id {
            cmd.arg("--").arg(id);
        }

        debug!(binary = %self.binary, mode = mode, "Listing keys");
        let output = cmd.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
                trace!(id = ?id, "No matching keys");
                return Ok(parse_colons(&stdout));
            }
            return Err(KeyRingError::Backend(stderr.trim().to_string()));
        }

        Ok(parse_colons(&stdout))
    }
}

impl KeyRing for GpgKeyRing {
    fn list_public_keys(&self, id: &str) -> Result<Vec<KeyInfo>, KeyRingError> {
        self.list("--list-keys", Some(id))
    }

    fn list_private_keys(&self) -> Result<Vec<KeyInfo>, KeyRingError> {
        self.list("--list-secret-keys", None)
    }
}

#[derive(Default)]
struct PartialKey {
    fingerprint: Option<String>,
    user_id: Option<String>,
    usable: bool,
    // the next fpr record belongs to the primary key
    awaiting_fpr: bool,
}

impl PartialKey {
    fn finish(self) -> Option<KeyInfo> {
        let fingerprint = self.fingerprint?;
        let key = KeyInfo::new(fingerprint, self.user_id.unwrap_or_default());
        Some(if self.usable { key } else { key.unusable() })
    }
}

/// Parse `gpg --with-colons --fingerprint` output.
pub fn parse_colons(output: &str) -> Vec<KeyInfo> {
    let mut keys = Vec::new();
    let mut current: Option<PartialKey> = None;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") | Some("sec") => {
                if let Some(key) = current.take().and_then(PartialKey::finish) {
                    keys.push(key);
                }
                current = Some(PartialKey {
                    usable: record_usable(&fields),
                    awaiting_fpr: true,
                    ..PartialKey::default()
                });
            }
            Some("sub") | Some("ssb") => {
                if let Some(key) = current.as_mut() {
                    key.awaiting_fpr = false;
                }
            }
            Some("fpr") => {
                if let Some(key) = current.as_mut().filter(|k| k.awaiting_fpr) {
                    key.fingerprint = fields.get(9).map(|f| f.to_string());
                    key.awaiting_fpr = false;
                }
            }
            Some("uid") => {
                if let Some(key) = current.as_mut().filter(|k| k.user_id.is_none()) {
                    key.user_id = fields.get(9).map(|f| unescape(f));
                }
            }
            _ => {}
        }
    }

    if let Some(key) = current.and_then(PartialKey::finish) {
        keys.push(key);
    }
    keys
}

fn record_usable(fields: &[&str]) -> bool {
    let validity = fields.get(1).and_then(|v| v.chars().next());
    let disabled = fields.get(11).is_some_and(|caps| caps.contains('D'));
    !disabled && !validity.is_some_and(|v| UNUSABLE_VALIDITY.contains(&v))
}

/// Undo gpg's `\xHH` escaping in user IDs.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let Some(b) = field
                .get(i + 2..i + 4)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
