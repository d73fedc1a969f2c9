use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::error::RuleError;
use super::rule::{Rule, RuleKind};

/// Builder for constructing a [`RuleSet`] in code.
///
/// # Example
///
/// ```
/// use extwake::RuleSetBuilder;
///
/// let rules = RuleSetBuilder::new()
///     .entity("grammar-helper", |e| e.rule("docs.google.com"))
///     .entity("dev-tools", |e| e.rule("github.com").rule(r"/^https://.*\.gitlab\.com/"))
///     .build();
///
/// assert!(rules.is_managed("dev-tools"));
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    entities: Vec<(EntityId, Vec<Rule>)>,
}

/// Intermediate builder passed to the entity definition closure.
#[derive(Debug, Default)]
pub struct EntityRulesBuilder {
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the rules for one entity. Defining the same entity twice
    /// appends to its rule list.
    #[must_use]
    pub fn entity(
        mut self,
        id: &str,
        f: impl FnOnce(EntityRulesBuilder) -> EntityRulesBuilder,
    ) -> Self {
        let builder = f(EntityRulesBuilder::default());
        self.entities.push((EntityId::from(id), builder.rules));
        self
    }

    /// Build the rule set. Entities that ended up with no rules are dropped.
    #[must_use]
    pub fn build(self) -> RuleSet {
        let mut set = RuleSet::new();
        for (id, rules) in self.entities {
            if rules.is_empty() {
                continue;
            }
            set.entities.entry(id).or_default().extend(rules);
        }
        set
    }
}

impl EntityRulesBuilder {
    /// Add a rule from its raw string form (`/…/` for a regex).
    #[must_use]
    pub fn rule(mut self, raw: &str) -> Self {
        self.rules.push(Rule::parse(raw));
        self
    }
}

/// Mapping of entity identifier to its ordered, non-empty rule list.
///
/// An entity with no key here is unmanaged: the reconciler never touches it.
/// The editing methods keep the non-empty invariant by removing an entity's
/// key together with its last rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<EntityId, Vec<Rule>>",
    into = "BTreeMap<EntityId, Vec<Rule>>"
)]
pub struct RuleSet {
    entities: BTreeMap<EntityId, Vec<Rule>>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the entity has at least one rule.
    #[must_use]
    pub fn is_managed(&self, id: &str) -> bool {
        self.entities.get(id).is_some_and(|rules| !rules.is_empty())
    }

    #[must_use]
    pub fn rules_for(&self, id: &str) -> Option<&[Rule]> {
        self.entities.get(id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &[Rule])> {
        self.entities.iter().map(|(id, rules)| (id, rules.as_slice()))
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    /// Number of managed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Total number of rules across all entities.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    /// Stored rules whose regex failed to compile.
    pub fn invalid_rules(&self) -> impl Iterator<Item = (&EntityId, &Rule)> {
        self.iter()
            .flat_map(|(id, rules)| rules.iter().map(move |rule| (id, rule)))
            .filter(|(_, rule)| !rule.is_valid())
    }

    /// Parse editor input and append it to the entity's rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EmptyRule`] for blank input and
    /// [`RuleError::InvalidPattern`] for a regex that does not compile.
    pub fn add_rule(&mut self, id: &str, input: &str, kind: RuleKind) -> Result<&Rule, RuleError> {
        let rule = Rule::from_input(input, kind)?;
        let rules = self.entities.entry(EntityId::from(id)).or_default();
        rules.push(rule);
        Ok(&rules[rules.len() - 1])
    }

    /// Remove the rule at `index`. Removing the last rule un-manages the entity.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownEntity`] or [`RuleError::RuleNotFound`].
    pub fn remove_rule(&mut self, id: &str, index: usize) -> Result<Rule, RuleError> {
        let rules = self
            .entities
            .get_mut(id)
            .ok_or_else(|| RuleError::UnknownEntity {
                entity: id.to_owned(),
            })?;
        if index >= rules.len() {
            return Err(RuleError::RuleNotFound {
                entity: id.to_owned(),
                index,
            });
        }
        let removed = rules.remove(index);
        if rules.is_empty() {
            self.entities.remove(id);
        }
        Ok(removed)
    }

    /// Replace an entity's rules wholesale. An empty list un-manages it.
    pub fn set_rules(&mut self, id: impl Into<EntityId>, rules: Vec<Rule>) {
        let id = id.into();
        if rules.is_empty() {
            self.entities.remove(&id);
        } else {
            self.entities.insert(id, rules);
        }
    }

    /// Drop every rule of an entity, un-managing it. Returns the removed
    /// rules, or `None` if the entity was not managed.
    pub fn remove_entity(&mut self, id: &str) -> Option<Vec<Rule>> {
        self.entities.remove(id)
    }
}

impl From<BTreeMap<EntityId, Vec<Rule>>> for RuleSet {
    fn from(mut entities: BTreeMap<EntityId, Vec<Rule>>) -> Self {
        entities.retain(|_, rules| !rules.is_empty());
        Self { entities }
    }
}

impl From<RuleSet> for BTreeMap<EntityId, Vec<Rule>> {
    fn from(set: RuleSet) -> Self {
        set.entities
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({} entities, {} rules)",
            self.len(),
            self.rule_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_entities() {
        let set = RuleSetBuilder::new()
            .entity("a", |e| e.rule("github.com").rule("/^https/"))
            .entity("b", |e| e.rule("example.org"))
            .build();

        assert_eq!(set.len(), 2);
        assert_eq!(set.rule_count(), 3);
        assert_eq!(set.rules_for("a").unwrap()[1].as_str(), "/^https/");
        assert_eq!(set.to_string(), "RuleSet(2 entities, 3 rules)");
    }

    #[test]
    fn builder_drops_entities_without_rules() {
        let set = RuleSetBuilder::new().entity("empty", |e| e).build();
        assert!(set.is_empty());
        assert!(!set.is_managed("empty"));
    }

    #[test]
    fn builder_merges_repeated_entity() {
        let set = RuleSetBuilder::new()
            .entity("a", |e| e.rule("x"))
            .entity("a", |e| e.rule("y"))
            .build();
        assert_eq!(set.rules_for("a").unwrap().len(), 2);
    }

    #[test]
    fn add_rule_rejects_empty_input() {
        let mut set = RuleSet::new();
        assert_eq!(
            set.add_rule("a", "  ", RuleKind::Domain),
            Err(RuleError::EmptyRule)
        );
        assert!(set.is_empty());
    }

    #[test]
    fn add_rule_rejects_invalid_regex_without_creating_entity() {
        let mut set = RuleSet::new();
        let err = set.add_rule("a", "/[/", RuleKind::Domain).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
        assert!(!set.is_managed("a"));
    }

    #[test]
    fn removing_last_rule_removes_entity() {
        let mut set = RuleSetBuilder::new()
            .entity("a", |e| e.rule("x").rule("y"))
            .build();

        let removed = set.remove_rule("a", 0).unwrap();
        assert_eq!(removed.as_str(), "x");
        assert!(set.is_managed("a"));

        set.remove_rule("a", 0).unwrap();
        assert!(!set.is_managed("a"));
        assert!(set.rules_for("a").is_none());
    }

    #[test]
    fn remove_rule_errors() {
        let mut set = RuleSetBuilder::new().entity("a", |e| e.rule("x")).build();
        assert_eq!(
            set.remove_rule("b", 0),
            Err(RuleError::UnknownEntity { entity: "b".into() })
        );
        assert_eq!(
            set.remove_rule("a", 5),
            Err(RuleError::RuleNotFound {
                entity: "a".into(),
                index: 5
            })
        );
    }

    #[test]
    fn set_rules_with_empty_list_unmanages() {
        let mut set = RuleSetBuilder::new().entity("a", |e| e.rule("x")).build();
        set.set_rules("a", Vec::new());
        assert!(set.is_empty());
    }

    #[test]
    fn deserialize_drops_empty_lists() {
        let set: RuleSet =
            serde_json::from_str(r#"{"a": ["github.com"], "b": []}"#).unwrap();
        assert!(set.is_managed("a"));
        assert!(!set.is_managed("b"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn invalid_rules_are_listed() {
        let set = RuleSetBuilder::new()
            .entity("a", |e| e.rule("/[/").rule("ok"))
            .build();
        let invalid: Vec<_> = set.invalid_rules().map(|(id, r)| (id.as_str(), r.as_str())).collect();
        assert_eq!(invalid, vec![("a", "/[/")]);
    }

    #[test]
    fn remove_entity_drops_all_rules() {
        let mut set = RuleSetBuilder::new()
            .entity("a", |e| e.rule("x").rule("/y/"))
            .entity("b", |e| e.rule("z"))
            .build();

        let removed = set.remove_entity("a").unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!set.is_managed("a"));
        assert!(set.is_managed("b"));
        assert_eq!(set.remove_entity("a"), None);
    }
}
