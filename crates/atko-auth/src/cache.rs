//! Persisted token cache
//!
//! One JSON document maps profile name → resource type name → `{access_token,
//! refresh_token}`. A missing or zero-length file is an empty cache. A non-empty file that
//! does not parse is reported as corrupt and left untouched; the operator removes it. Every
//! store rewrites the whole document, so two processes writing at once race and the later
//! writer wins.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};

/// Cached tokens of one (profile, resource) pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl fmt::Debug for TokenEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEntry")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .finish()
    }
}

/// On-disk layout: profile → resource type → entry
pub type TokenCacheFile = BTreeMap<String, BTreeMap<String, TokenEntry>>;

/// Token cache backed by a JSON file
#[derive(Debug)]
pub struct TokenCache {
    path: PathBuf,
    entries: TokenCacheFile,
}

impl TokenCache {
    /// Read the cache at `path`
    ///
    /// # Errors
    ///
    /// [`AuthError::CacheCorruption`] when the file is non-empty and not a valid cache
    /// document; I/O errors other than "not found".
    pub fn load(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "token cache not found, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let entries = if raw.is_empty() {
            TokenCacheFile::new()
        } else {
            serde_json::from_slice(&raw).map_err(|e| {
                warn!(path = %path.display(), error = %e, "token cache does not parse");
                AuthError::CacheCorruption { path: path.clone() }
            })?
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document
    pub fn entries(&self) -> &TokenCacheFile {
        &self.entries
    }

    /// Copy of the entry cached for `(profile, resource)`
    pub fn get_entry(&self, profile: &str, resource: &str) -> Option<TokenEntry> {
        self.entries.get(profile)?.get(resource).cloned()
    }

    /// Store tokens for `(profile, resource)` and rewrite the file
    ///
    /// # Errors
    ///
    /// I/O errors while writing the file.
    pub fn put_entry(
        &mut self,
        profile: &str,
        resource: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> AuthResult<()> {
        self.entries.entry(profile.to_string()).or_default().insert(
            resource.to_string(),
            TokenEntry {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            },
        );
        debug!(profile, resource, "storing token entry");
        self.persist()
    }

    /// JSON view of the sub-tree addressed by `key`
    pub fn select(&self, key: &CacheKey) -> Option<Value> {
        let profile = self.entries.get(&key.profile)?;
        let Some(resource) = &key.resource else {
            return serde_json::to_value(profile).ok();
        };
        let entry = profile.get(resource)?;
        match key.field {
            None => serde_json::to_value(entry).ok(),
            Some(CacheField::AccessToken) => Some(Value::String(entry.access_token.clone())),
            Some(CacheField::RefreshToken) => Some(Value::String(entry.refresh_token.clone())),
        }
    }

    /// Remove the sub-tree addressed by `key` and rewrite the file
    ///
    /// Removing a field clears it. Returns `false` when nothing matched.
    ///
    /// # Errors
    ///
    /// I/O errors while writing the file.
    pub fn remove(&mut self, key: &CacheKey) -> AuthResult<bool> {
        let removed = match (&key.resource, key.field) {
            (None, _) => self.entries.remove(&key.profile).is_some(),
            (Some(resource), None) => {
                let removed = self
                    .entries
                    .get_mut(&key.profile)
                    .and_then(|profile| profile.remove(resource))
                    .is_some();
                if self.entries.get(&key.profile).is_some_and(BTreeMap::is_empty) {
                    self.entries.remove(&key.profile);
                }
                removed
            }
            (Some(resource), Some(field)) => {
                match self
                    .entries
                    .get_mut(&key.profile)
                    .and_then(|profile| profile.get_mut(resource))
                {
                    Some(entry) => {
                        match field {
                            CacheField::AccessToken => entry.access_token.clear(),
                            CacheField::RefreshToken => entry.refresh_token.clear(),
                        }
                        true
                    }
                    None => false,
                }
            }
        };

        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Token field addressed by a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheField {
    AccessToken,
    RefreshToken,
}

/// `profile[:resource[:field]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub profile: String,
    pub resource: Option<String>,
    pub field: Option<CacheField>,
}

impl FromStr for CacheKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AuthError::InvalidCacheKey(s.to_string());
        let segments: Vec<&str> = s.split(':').collect();
        if segments.len() > 3 || segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(invalid());
        }

        let field = match segments.get(2) {
            None => None,
            Some(&"access_token") => Some(CacheField::AccessToken),
            Some(&"refresh_token") => Some(CacheField::RefreshToken),
            Some(_) => return Err(invalid()),
        };

        Ok(Self {
            profile: segments[0].to_string(),
            resource: segments.get(1).map(|r| (*r).to_string()),
            field,
        })
    }
}
