#![allow(dead_code)]

use extwake::{AllowList, EntityId, EntityRecord, OpenAddressSet, RuleSet, RuleSetBuilder};
use proptest::prelude::*;

// --- Fixed universe ---
// Installed entities are ENTITIES plus the toggler; rule owners are drawn
// from RULE_OWNERS. Tab addresses come from HOSTS x PATHS plus a few internal
// and unparseable addresses. Rules are drawn from RULES so that
// generated rule sets match generated tabs often enough to be interesting.

pub const SELF_ID: &str = "extwake";

const ENTITIES: &[&str] = &["dev", "mail", "docs", "video", "chat", "shop"];

/// Ids that may own rules. Includes the toggler itself, which must never be
/// toggled even when rules name it.
const RULE_OWNERS: &[&str] = &["dev", "mail", "docs", "video", "chat", "shop", SELF_ID];

const HOSTS: &[&str] = &[
    "github.com",
    "gist.github.com",
    "mail.google.com",
    "docs.rs",
    "www.youtube.com",
    "localhost:8080",
];

const PATHS: &[&str] = &["/", "/inbox", "/rust-lang/rust", "/watch?v=1", "/Settings"];

const ODD_ADDRESSES: &[&str] = &["chrome://extensions", "about:blank", "not a url", ""];

const RULES: &[&str] = &[
    "github.com",
    "github",
    "google.com",
    "docs",
    "youtube",
    "localhost",
    "Settings",
    "/^https://mail\\./",
    "/github\\.com\\/rust/",
    "/WATCH/",
    "/(unclosed/",
    "/^(?!.*inbox).*google/",
    "/(\\w+)\\.\\1/",
    "/[z-a]/",
    "//",
];

/// A generated address: either a regular web page or one of the odd ones.
pub fn arb_address() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (prop::sample::select(HOSTS), prop::sample::select(PATHS))
            .prop_map(|(host, path)| format!("https://{host}{path}")),
        1 => prop::sample::select(ODD_ADDRESSES).prop_map(str::to_owned),
    ]
}

/// Addresses of 0..=6 open tabs. Duplicates are allowed on purpose.
pub fn arb_tab_urls() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_address(), 0..=6)
}

pub fn arb_open_set() -> impl Strategy<Value = OpenAddressSet> {
    arb_tab_urls().prop_map(|urls| urls.into_iter().collect())
}

/// A generated rule set (entity -> raw rule strings). Entities may end up
/// with no rules, in which case the builder drops them.
#[derive(Debug, Clone)]
pub struct GenRuleSet {
    pub entities: Vec<(String, Vec<String>)>,
}

impl GenRuleSet {
    #[must_use]
    pub fn build(&self) -> RuleSet {
        let mut builder = RuleSetBuilder::new();
        for (id, rules) in &self.entities {
            let rules = rules.clone();
            builder = builder.entity(id.as_str(), move |mut e| {
                for rule in &rules {
                    e = e.rule(rule.as_str());
                }
                e
            });
        }
        builder.build()
    }
}

pub fn arb_ruleset() -> impl Strategy<Value = GenRuleSet> {
    prop::sample::subsequence(RULE_OWNERS.to_vec(), 0..=RULE_OWNERS.len()).prop_flat_map(|ids| {
        let n = ids.len();
        prop::collection::vec(
            prop::collection::vec(prop::sample::select(RULES).prop_map(str::to_owned), 0..=3),
            n,
        )
        .prop_map(move |rule_lists| GenRuleSet {
            entities: ids
                .iter()
                .map(|id| (*id).to_owned())
                .zip(rule_lists)
                .collect(),
        })
    })
}

/// Installed extensions: every entity in the universe plus the toggler
/// itself, each with a random enabled flag.
pub fn arb_installed() -> impl Strategy<Value = Vec<EntityRecord>> {
    prop::collection::vec(any::<bool>(), ENTITIES.len() + 1).prop_map(|flags| {
        ENTITIES
            .iter()
            .copied()
            .chain(std::iter::once(SELF_ID))
            .zip(flags)
            .map(|(id, enabled)| EntityRecord::new(id, id.to_uppercase(), enabled))
            .collect()
    })
}

/// Stored allow-list entries (the toggler itself is added on load).
pub fn arb_whitelist() -> impl Strategy<Value = Vec<EntityId>> {
    prop::sample::subsequence(ENTITIES.to_vec(), 0..=2)
        .prop_map(|ids| ids.into_iter().map(EntityId::from).collect())
}

#[must_use]
pub fn allow_list(whitelist: &[EntityId]) -> AllowList {
    AllowList::new(SELF_ID, whitelist.iter().cloned())
}
