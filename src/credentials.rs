//! API key retrieval.
//!
//! Two strategies, chosen by configuration:
//!
//! | Source | Reads | Writes |
//! |---|---|---|
//! | [`KeyringKeySource`] | OS credential store (`Callbench` / `OPENAI_API_KEY`) | yes |
//! | [`EnvKeySource`] | an environment variable | no |
//!
//! The key is never validated beyond being present and non-empty.

use std::sync::Mutex;

use crate::error::{CallbenchError, Result};

/// Credential-store service name.
pub const SERVICE_NAME: &str = "Callbench";

/// Credential-store entry name, also the default environment variable.
pub const KEY_NAME: &str = "OPENAI_API_KEY";

/// Somewhere an API key can be looked up (and possibly stored).
pub trait KeySource: Send + Sync {
    /// The stored key, or `None` if there is none.
    fn get(&self) -> Result<Option<String>>;

    /// Store `key`, replacing any previous one.
    fn set(&self, key: &str) -> Result<()>;

    /// Whether [`set`](KeySource::set) can succeed.
    fn is_writable(&self) -> bool;

    /// Human-readable location, used in messages.
    fn describe(&self) -> String;
}

fn non_empty(key: String) -> Option<String> {
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment variable
// ─────────────────────────────────────────────────────────────────────────────

/// Reads the key from an environment variable; read-only.
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    var: String,
}

impl EnvKeySource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new(KEY_NAME)
    }
}

impl KeySource for EnvKeySource {
    fn get(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.var).ok().and_then(non_empty))
    }

    fn set(&self, _key: &str) -> Result<()> {
        Err(CallbenchError::Configuration(format!(
            "the API key is read from ${}; export it there instead",
            self.var
        )))
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("environment variable {}", self.var)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OS keyring
// ─────────────────────────────────────────────────────────────────────────────

/// Stores the key in the platform credential store.
#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringKeySource {
    service: String,
    user: String,
}

#[cfg(feature = "keyring")]
impl KeyringKeySource {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self { service: service.into(), user: user.into() }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user).map_err(|e| {
            CallbenchError::Configuration(format!("credential store unavailable: {}", e))
        })
    }
}

#[cfg(feature = "keyring")]
impl Default for KeyringKeySource {
    fn default() -> Self {
        Self::new(SERVICE_NAME, KEY_NAME)
    }
}

#[cfg(feature = "keyring")]
impl KeySource for KeyringKeySource {
    fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(key) => Ok(non_empty(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CallbenchError::Configuration(format!(
                "cannot read API key from credential store: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &str) -> Result<()> {
        self.entry()?.set_password(key).map_err(|e| {
            CallbenchError::Configuration(format!("cannot save API key to credential store: {}", e))
        })
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("credential store entry {}/{}", self.service, self.user)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local key holder, for a key supplied on the command line and for tests.
#[derive(Debug, Default)]
pub struct MemoryKeySource {
    key: Mutex<Option<String>>,
}

impl MemoryKeySource {
    pub fn new(key: Option<String>) -> Self {
        Self { key: Mutex::new(key.and_then(non_empty)) }
    }
}

impl KeySource for MemoryKeySource {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.key.lock().map(|k| k.clone()).unwrap_or(None))
    }

    fn set(&self, key: &str) -> Result<()> {
        if let Ok(mut slot) = self.key.lock() {
            *slot = non_empty(key.to_string());
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "in-memory key".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Load the key from `source`, asking `prompt` when none is stored.
///
/// A prompted key is saved back to `source`. A read-only source with no key,
/// or a cancelled/empty prompt, is a [`CallbenchError::Configuration`].
pub fn resolve_api_key<P>(source: &dyn KeySource, prompt: P) -> Result<String>
where
    P: FnOnce() -> Option<String>,
{
    if let Some(key) = source.get()? {
        return Ok(key);
    }
    if !source.is_writable() {
        return Err(CallbenchError::Configuration(format!(
            "no API key found in {}",
            source.describe()
        )));
    }
    let key = prompt().and_then(non_empty).ok_or_else(|| {
        CallbenchError::Configuration("no API key entered".to_string())
    })?;
    source.set(&key)?;
    Ok(key)
}
