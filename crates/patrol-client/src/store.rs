//! Two-tier credential storage.
//!
//! Credentials live in an ephemeral tier (scoped to the current session) and
//! optionally a durable tier (survives restarts, "remember me"). Reads prefer
//! the ephemeral copy; clearing always wipes both tiers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::Credential;

/// Key holding the access token in both tiers.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token in both tiers.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable-tier marker recording that the user opted into persistence.
pub const REMEMBER_ME_KEY: &str = "remember_me";

/// Default file name for a file-backed tier.
pub const CREDENTIAL_FILE: &str = "credentials.json";

/// Errors raised by tier backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("failed to access credential file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("failed to parse credential file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Persistence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Scoped to the current session; gone when it ends.
    Ephemeral,
    /// Survives restarts.
    Durable,
}

impl Tier {
    /// Both tiers, in read-precedence order.
    pub const BOTH: [Tier; 2] = [Tier::Ephemeral, Tier::Durable];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Ephemeral => write!(f, "ephemeral"),
            Tier::Durable => write!(f, "durable"),
        }
    }
}

/// Which half of the credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key for this token.
    pub fn key(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_TOKEN_KEY,
            TokenKind::Refresh => REFRESH_TOKEN_KEY,
        }
    }
}

// ============================================================================
// TierBackend Trait
// ============================================================================

/// A string key-value store backing one tier.
///
/// Reads are served from memory and cannot fail; writes may.
pub trait TierBackend: Send + Sync + fmt::Debug {
    /// Look up a key.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value under a key.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ============================================================================
// MemoryTier
// ============================================================================

/// Process-lifetime tier.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TierBackend for MemoryTier {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// FileTier
// ============================================================================

/// Tier persisted as a flat JSON object on disk.
///
/// The file is read once at open; every mutation rewrites it.
#[derive(Debug)]
pub struct FileTier {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl FileTier {
    /// Open (or lazily create) the tier file at `path`.
    ///
    /// A file that is not a JSON object of strings (e.g. one truncated by an
    /// interrupted write) is discarded and rewritten empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = if path.exists() {
            std::fs::read_to_string(&path).map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?
        } else {
            String::new()
        };

        let (cache, corrupt) = if content.trim().is_empty() {
            (BTreeMap::new(), false)
        } else {
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => (entries, false),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "credential file is corrupt, discarding it"
                    );
                    (BTreeMap::new(), true)
                }
            }
        };

        let tier = Self {
            path,
            cache: RwLock::new(cache),
        };
        if corrupt {
            tier.flush(&BTreeMap::new())?;
        }
        Ok(tier)
    }

    /// Open the default credential file inside `dir`.
    pub fn in_dir(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join(CREDENTIAL_FILE))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |e| StoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|e| StoreError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)?;

        // Tokens: owner read/write only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        Ok(())
    }
}

impl TierBackend for FileTier {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.write();
        cache.insert(key.to_string(), value.to_string());
        self.flush(&cache)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.write();
        if cache.remove(key).is_some() {
            self.flush(&cache)?;
        }
        Ok(())
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Process-wide credential state shared by the client and the session manager.
///
/// Cloning is cheap; clones see the same tiers.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    ephemeral: Arc<dyn TierBackend>,
    durable: Arc<dyn TierBackend>,
}

impl CredentialStore {
    /// Create a store over the given tier backends.
    pub fn new(ephemeral: Arc<dyn TierBackend>, durable: Arc<dyn TierBackend>) -> Self {
        Self { ephemeral, durable }
    }

    /// Create a store with both tiers in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTier::new()), Arc::new(MemoryTier::new()))
    }

    fn tier(&self, tier: Tier) -> &dyn TierBackend {
        match tier {
            Tier::Ephemeral => self.ephemeral.as_ref(),
            Tier::Durable => self.durable.as_ref(),
        }
    }

    /// Read a token: the ephemeral copy if present, else the durable one.
    pub fn read(&self, kind: TokenKind) -> Option<String> {
        Tier::BOTH
            .iter()
            .find_map(|tier| self.read_tier(*tier, kind))
    }

    /// Read a token from one tier only.
    pub fn read_tier(&self, tier: Tier, kind: TokenKind) -> Option<String> {
        self.tier(tier).get(kind.key())
    }

    /// Write a token to every tier named.
    ///
    /// Tiers are written in order; the first failure aborts and is returned.
    pub fn write(&self, kind: TokenKind, value: &str, tiers: &[Tier]) -> Result<(), StoreError> {
        for tier in tiers {
            self.tier(*tier).set(kind.key(), value)?;
        }
        tracing::trace!(token = kind.key(), ?tiers, "credential written");
        Ok(())
    }

    /// Write both halves of a credential to every tier named.
    pub fn write_credential(&self, credential: &Credential, tiers: &[Tier]) -> Result<(), StoreError> {
        self.write(TokenKind::Access, &credential.access_token, tiers)?;
        self.write(TokenKind::Refresh, &credential.refresh_token, tiers)
    }

    /// Record that the user asked to be remembered (durable tier only).
    pub fn set_remember_me(&self) -> Result<(), StoreError> {
        self.durable.set(REMEMBER_ME_KEY, "true")
    }

    /// Whether the durable tier carries the remember-me marker.
    pub fn remember_me(&self) -> bool {
        self.durable.get(REMEMBER_ME_KEY).as_deref() == Some("true")
    }

    /// Whether any token is available in either tier.
    pub fn has_credentials(&self) -> bool {
        self.read(TokenKind::Access).is_some() || self.read(TokenKind::Refresh).is_some()
    }

    /// Remove both tokens and the remember-me marker from both tiers.
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// error is returned. Clearing an empty store is a no-op.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for tier in Tier::BOTH {
            for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REMEMBER_ME_KEY] {
                if let Err(e) = self.tier(tier).remove(key) {
                    tracing::warn!(%tier, key, error = %e, "failed to clear credential");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
