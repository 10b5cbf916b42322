use command_relay::bundle::BundleVersion;
use proptest::prelude::*;

/// Strategy for generating bundle names
pub fn bundle_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,31}"
}

/// Strategy for generating versions with components large enough to
/// expose lexicographic comparison bugs
pub fn version_strategy() -> impl Strategy<Value = BundleVersion> {
    (0u32..200, 0u32..200, 0u32..200)
        .prop_map(|(major, minor, patch)| BundleVersion::new(major, minor, patch))
}

/// Strategy for generating a non-empty set of distinct versions
pub fn distinct_versions_strategy() -> impl Strategy<Value = Vec<BundleVersion>> {
    prop::collection::btree_set(version_strategy(), 1..20).prop_map(|set| set.into_iter().collect())
}
