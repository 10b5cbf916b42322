//! Semantic version parsing and ordering for bundles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version format: {version}: {reason}")]
    InvalidFormat { version: String, reason: String },
}

impl VersionError {
    pub fn invalid_format(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            version: version.into(),
            reason: reason.into(),
        }
    }
}

/// `major.minor.patch`, compared numerically component by component.
///
/// Field order matters: the derived `Ord` compares `major`, then `minor`,
/// then `patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BundleVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl BundleVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `"x.y.z"`. Missing trailing components default to zero, so
    /// `"1.2"` is `1.2.0`.
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::invalid_format(
                version,
                "expected at most three components",
            ));
        }

        let mut components = [0u32; 3];
        for (slot, part) in components.iter_mut().zip(parts.iter()) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::invalid_format(
                    version,
                    format!("component '{part}' is not numeric"),
                ));
            }
            *slot = part.parse::<u32>().map_err(|_| {
                VersionError::invalid_format(version, format!("component '{part}' is not numeric"))
            })?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl FromStr for BundleVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for BundleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BundleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
