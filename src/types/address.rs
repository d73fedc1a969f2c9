use std::collections::BTreeSet;

use super::entity::TabInfo;

/// Address prefixes excluded from the open-address set by default.
pub const DEFAULT_INTERNAL_SCHEMES: &[&str] = &["chrome://"];

/// Set of addresses currently open across all tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenAddressSet {
    addresses: BTreeSet<String>,
}

impl OpenAddressSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the addresses of `tabs`, skipping tabs without one and any
    /// address starting with one of `internal_schemes`.
    pub fn from_tabs<S: AsRef<str>>(tabs: &[TabInfo], internal_schemes: &[S]) -> Self {
        tabs.iter()
            .filter_map(|tab| tab.url.as_deref())
            .filter(|url| {
                !internal_schemes
                    .iter()
                    .any(|scheme| url.starts_with(scheme.as_ref()))
            })
            .collect()
    }

    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        self.addresses.insert(address.into())
    }

    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for OpenAddressSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().map(Into::into).collect(),
        }
    }
}
