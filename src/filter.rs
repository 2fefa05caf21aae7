use std::collections::HashSet;

use crate::UNNAMED_NFT;

/// Accepted asset-name prefixes: lower-cased names with the trailing token
/// number removed. A sale is announced only if its key is listed here.
pub const VALID_NFT_NAMES: &[&str] = &[
    "jasarmas genesis",
    "jasarmas genesis pass",
    "jasarmas armory",
    "jasarmas armory blueprint",
    "jasarmas relic",
];

/// Set of filter keys a sale must match to be announced.
#[derive(Debug, Clone)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The compiled-in list.
    pub fn builtin() -> Self {
        Self::new(VALID_NFT_NAMES)
    }

    /// True when the key derived from `name` is an exact member.
    pub fn accepts(&self, name: &str) -> bool {
        self.names.contains(filter_key(name).as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Name to display for an asset, substituting `"Unnamed NFT"` when missing or empty.
pub fn display_name(name: Option<&str>) -> &str {
    match name {
        Some(n) if !n.is_empty() => n,
        _ => UNNAMED_NFT,
    }
}

/// Derive the filter key: lower-case, then drop everything from the last space on.
///
/// `"Cool Cat #12"` → `"cool cat"`. A name without a space yields `""`.
pub fn filter_key(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.rfind(' ') {
        Some(idx) => lower[..idx].to_string(),
        None => String::new(),
    }
}
