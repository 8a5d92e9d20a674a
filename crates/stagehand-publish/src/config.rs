//! Publish configuration
//!
//! Loaded from RON:
//!
//! ```ron
//! (
//!     database: Some("data/content.db"),
//!     auto_publish: false,
//! )
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for a [`crate::Publish`] instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Database file; `None` keeps everything in memory
    pub database: Option<PathBuf>,

    /// Publish each record right after a create, update or delete commits
    ///
    /// - `false`: records stay dirty until an explicit publish (default)
    /// - `true`: the record and the records it requires are published in
    ///   their own transaction after every write
    pub auto_publish: bool,
}

impl PublishConfig {
    /// In-memory store, explicit publishing
    pub fn new() -> Self {
        Self::default()
    }

    /// Same configuration with a database file
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Same configuration with auto publishing switched on or off
    pub fn with_auto_publish(mut self, auto_publish: bool) -> Self {
        self.auto_publish = auto_publish;
        self
    }

    /// Parse a RON string
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }
}
