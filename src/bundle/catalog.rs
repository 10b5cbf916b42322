//! # Bundle Catalog
//!
//! Thread-safe, version-aware registry of installed bundles.
//!
//! ## Overview
//!
//! The catalog maps a bundle name to every version known for it. Lookups
//! can target an exact `(name, version)` pair or resolve the latest version
//! of a name. A dirty flag records whether new content arrived since the
//! last announcement so the announcer only republishes when needed.
//!
//! ## Concurrency
//!
//! All state sits behind a single `parking_lot::RwLock`. Each `add` takes
//! the write lock for the whole insertion, so readers observe either the
//! old catalog or the fully updated one. Lookups take the read lock and are
//! expected to dominate.
//!
//! ## Usage
//!
//! ```rust
//! use command_relay::bundle::{Bundle, BundleCatalog};
//!
//! let catalog = BundleCatalog::new();
//! catalog.add(Bundle::new("foo", "1.2.0", "native").unwrap());
//! catalog.add(Bundle::new("foo", "1.2.1", "native").unwrap());
//!
//! let latest = catalog.find_latest("foo").unwrap();
//! assert_eq!(latest.version.to_string(), "1.2.1");
//! assert!(catalog.should_announce());
//! ```

use super::{Bundle, BundleVersion};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct CatalogState {
    bundles: HashMap<String, BTreeMap<BundleVersion, Arc<Bundle>>>,
    count: usize,
    dirty: bool,
}

/// Registry of known bundles indexed by name and version
#[derive(Debug, Default)]
pub struct BundleCatalog {
    state: RwLock<CatalogState>,
}

impl BundleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bundle under `(name, version)`.
    ///
    /// Re-adding an existing pair replaces the stored entry. Returns `false`
    /// only when the bundle has an empty name.
    pub fn add(&self, bundle: Bundle) -> bool {
        if bundle.name.trim().is_empty() {
            warn!(
                version = %bundle.version,
                "Rejected bundle with empty name"
            );
            return false;
        }

        let key = bundle.key();
        let mut state = self.state.write();
        let versions = state.bundles.entry(bundle.name.clone()).or_default();
        let replaced = versions.insert(bundle.version, Arc::new(bundle)).is_some();
        if !replaced {
            state.count += 1;
        }
        state.dirty = true;

        debug!(bundle = %key, replaced, total = state.count, "Bundle added to catalog");
        true
    }

    /// Exact-match lookup
    pub fn find(&self, name: &str, version: &BundleVersion) -> Option<Arc<Bundle>> {
        let state = self.state.read();
        state
            .bundles
            .get(name)
            .and_then(|versions| versions.get(version))
            .cloned()
    }

    /// Exact-match lookup from a version string; an unparseable version
    /// never matches
    pub fn find_str(&self, name: &str, version: &str) -> Option<Arc<Bundle>> {
        let version = BundleVersion::parse(version).ok()?;
        self.find(name, &version)
    }

    /// Highest stored version for `name`
    pub fn find_latest(&self, name: &str) -> Option<Arc<Bundle>> {
        let state = self.state.read();
        state
            .bundles
            .get(name)
            .and_then(|versions| versions.values().next_back())
            .cloned()
    }

    /// Total number of stored `(name, version)` pairs
    pub fn count(&self) -> usize {
        self.state.read().count
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// True if at least one `add` succeeded since the last
    /// [`mark_announced`](Self::mark_announced)
    pub fn should_announce(&self) -> bool {
        self.state.read().dirty
    }

    /// Clear the dirty flag after the catalog has been announced
    pub fn mark_announced(&self) {
        self.state.write().dirty = false;
    }

    /// Bundle names in sorted order
    pub fn names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state.bundles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Known versions of `name`, ascending
    pub fn versions(&self, name: &str) -> Vec<BundleVersion> {
        let state = self.state.read();
        state
            .bundles
            .get(name)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Latest version of every bundle, sorted by name
    pub fn latest_bundles(&self) -> Vec<Arc<Bundle>> {
        let state = self.state.read();
        let mut latest: Vec<Arc<Bundle>> = state
            .bundles
            .values()
            .filter_map(|versions| versions.values().next_back().cloned())
            .collect();
        latest.sort_by(|a, b| a.name.cmp(&b.name));
        latest
    }
}
