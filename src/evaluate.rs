use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tracing::debug;
use url::Url;

use crate::{AllowList, DesireReason, DesiredReport, EntityId, OpenAddressSet, Rule, RuleSet};

/// Whether `rule` matches any address in `addresses`.
///
/// Regex rules test the full address. Substring rules test the parsed
/// hostname and the raw address; an address that does not parse is tested
/// raw only. An invalid regex never matches, and neither does a regex whose
/// match exceeds the backtracking limit.
#[must_use]
pub fn matches(rule: &Rule, addresses: &OpenAddressSet) -> bool {
    first_match(rule, addresses).is_some()
}

/// The first address (in set order) that `rule` matches.
#[must_use]
pub fn first_match<'a>(rule: &Rule, addresses: &'a OpenAddressSet) -> Option<&'a str> {
    if !rule.is_valid() {
        return None;
    }
    addresses.iter().find(|address| matches_address(rule, address))
}

pub(crate) fn matches_address(rule: &Rule, address: &str) -> bool {
    match rule {
        Rule::Regex { source, regex } => regex.is_match(address).unwrap_or_else(|e| {
            debug!(rule = %source, %address, error = %e, "regex match aborted, treating as no match");
            false
        }),
        Rule::InvalidRegex { .. } => false,
        Rule::Substring { needle } => {
            hostname(address).is_some_and(|host| host.contains(needle.as_str()))
                || address.contains(needle.as_str())
        }
    }
}

fn hostname(address: &str) -> Option<String> {
    let url = Url::parse(address).ok()?;
    url.host_str().map(str::to_owned)
}

/// Compute the set of entities that should be enabled.
///
/// The result is the allow-list plus every entity in `rules` with at least
/// one rule matching an open address.
#[must_use]
pub fn compute_desired(
    rules: &RuleSet,
    allow_list: &AllowList,
    addresses: &OpenAddressSet,
) -> BTreeSet<EntityId> {
    let mut desired: BTreeSet<EntityId> = allow_list.iter().cloned().collect();
    for (id, entity_rules) in rules.iter() {
        if entity_rules.iter().any(|rule| matches(rule, addresses)) {
            desired.insert(id.clone());
        }
    }
    desired
}

/// Like [`compute_desired()`], but records why each entity is desired.
///
/// An allow-listed entity whose rule also matched reports the rule.
pub fn evaluate_detailed(
    rules: &RuleSet,
    allow_list: &AllowList,
    addresses: &OpenAddressSet,
) -> DesiredReport {
    let start = Instant::now();

    let mut reasons: BTreeMap<EntityId, DesireReason> = allow_list
        .iter()
        .map(|id| (id.clone(), DesireReason::AllowListed))
        .collect();

    for (id, entity_rules) in rules.iter() {
        let hit = entity_rules
            .iter()
            .find_map(|rule| first_match(rule, addresses).map(|address| (rule, address)));
        if let Some((rule, address)) = hit {
            reasons.insert(
                id.clone(),
                DesireReason::RuleMatched {
                    rule: rule.as_str().to_owned(),
                    address: address.to_owned(),
                },
            );
        }
    }

    DesiredReport::new(reasons, start.elapsed())
}
