//! # Command Bundles
//!
//! A bundle is a named, versioned unit of installable commands. Bundles are
//! created from installation metadata, handed to the [`BundleCatalog`], and
//! never mutated afterwards.

pub mod catalog;
pub mod version;

pub use catalog::BundleCatalog;
pub use version::{BundleVersion, VersionError};

use serde::{Deserialize, Serialize};

/// A named, versioned unit of installable commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub version: BundleVersion,
    /// Name of the runtime engine that executes this bundle's commands
    pub engine: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Bundle {
    /// Create a bundle, parsing `version` as `major.minor.patch`
    pub fn new(
        name: impl Into<String>,
        version: &str,
        engine: impl Into<String>,
    ) -> Result<Self, VersionError> {
        Ok(Self {
            name: name.into(),
            version: BundleVersion::parse(version)?,
            engine: engine.into(),
            commands: Vec::new(),
        })
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// `name@version`, used in log lines
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
