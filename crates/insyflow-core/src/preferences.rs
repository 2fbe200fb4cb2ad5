//! Dashboard preferences: theme, locale and the connected website.
//!
//! Loaded once at startup and written back on every change. The store is
//! owned by the server state; there is no global instance.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub website: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            locale: default_locale(),
            website: None,
        }
    }
}

/// Partial update. `website: null` disconnects; an absent field is left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub locale: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_nullable")]
    pub website: Option<Option<String>>,
}

fn deserialize_optional_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

impl Preferences {
    pub fn apply(&mut self, update: PreferencesUpdate) -> Result<(), CoreError> {
        if let Some(locale) = update.locale {
            let locale = locale.trim();
            if locale.is_empty() || locale.len() > 35 {
                return Err(CoreError::InvalidPreference(
                    "locale must be a non-empty language tag".to_string(),
                ));
            }
            self.locale = locale.to_string();
        }
        if let Some(website) = update.website {
            self.website = match website {
                Some(url) => {
                    let url = url.trim();
                    if url.is_empty() {
                        return Err(CoreError::InvalidPreference(
                            "website must not be empty (send null to disconnect)".to_string(),
                        ));
                    }
                    Some(url.to_string())
                }
                None => None,
            };
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        Ok(())
    }
}

pub struct PreferencesStore {
    /// `None` keeps preferences in memory only.
    path: Option<PathBuf>,
    current: RwLock<Preferences>,
}

impl PreferencesStore {
    /// Load from `path`. A missing file means defaults; an unreadable or
    /// corrupt one is logged and replaced with defaults on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt preferences file, using defaults");
                Preferences::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable preferences file, using defaults");
                Preferences::default()
            }
        };
        Self {
            path: Some(path),
            current: RwLock::new(current),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(Preferences::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self) -> Preferences {
        self.current.read().await.clone()
    }

    /// Apply `update` and persist. On a validation or write failure the
    /// in-memory preferences are left untouched.
    pub async fn update(&self, update: PreferencesUpdate) -> Result<Preferences, CoreError> {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        next.apply(update)?;
        if let Some(path) = &self.path {
            save(path, &next).await?;
        }
        *guard = next.clone();
        Ok(next)
    }
}

async fn save(path: &Path, prefs: &Preferences) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(prefs)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
