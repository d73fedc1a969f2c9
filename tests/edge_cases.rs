use std::sync::Arc;

use extwake::{
    AllowList, AuditLog, Config, DesireReason, EntityId, EntityRecord, JsonFileStore,
    MemoryRegistry, MemoryTabs, OpenAddressSet, Reconciler, Rule, RuleError, RuleKind, RuleSet,
    RuleSetBuilder, Store, TabInfo, TabStatus, compute_desired, evaluate_detailed, matches,
};

fn open(addresses: &[&str]) -> OpenAddressSet {
    addresses.iter().copied().collect()
}

fn no_allow() -> AllowList {
    AllowList::new("extwake", Vec::<String>::new())
}

#[test]
fn regex_rule_matches_subdomain() {
    let rules = RuleSetBuilder::new()
        .entity("extB", |e| e.rule(r"/^https://.*\.example\.com/"))
        .build();
    let desired = compute_desired(&rules, &no_allow(), &open(&["https://mail.example.com/"]));
    assert!(desired.contains("extB"));
}

#[test]
fn regex_is_case_insensitive() {
    let rule = Rule::parse("/GITHUB/");
    assert!(matches(&rule, &open(&["https://github.com/"])));
}

#[test]
fn two_slashes_is_a_substring_rule() {
    let rule = Rule::parse("//");
    assert_eq!(rule.kind(), RuleKind::Domain);
    assert!(matches(&rule, &open(&["https://github.com/"])));
    assert!(!matches(&rule, &open(&["about:blank"])));
}

#[test]
fn invalid_regex_matches_nothing() {
    let rule = Rule::parse("/[/");
    assert!(!rule.is_valid());
    assert!(!matches(&rule, &open(&["/[/", "https://[.com/", "anything"])));
}

#[test]
fn substring_does_not_match_other_hosts_by_accident() {
    let rule = Rule::parse("github.com");
    assert!(!matches(&rule, &open(&["https://gitlab.com/github"])));
    assert!(matches(&rule, &open(&["https://gitlab.com/?from=github.com"])));
}

#[test]
fn address_with_uppercase_host_matches_lowercase_rule() {
    let rule = Rule::parse("github.com");
    assert!(matches(&rule, &open(&["https://GitHub.COM/rust-lang"])));
}

#[test]
fn editor_input_is_validated() {
    assert_eq!(
        Rule::from_input("   ", RuleKind::Domain),
        Err(RuleError::EmptyRule)
    );
    assert!(matches!(
        Rule::from_input("(", RuleKind::Regex),
        Err(RuleError::InvalidPattern { .. })
    ));
    let rule = Rule::from_input(r"^https://.*\.dev", RuleKind::Regex).unwrap();
    assert_eq!(rule.as_str(), r"/^https://.*\.dev/");
}

#[test]
fn removing_last_rule_unmanages_entity() {
    let mut rules = RuleSet::new();
    rules.add_rule("a", "github.com", RuleKind::Domain).unwrap();
    rules.add_rule("a", "gitlab", RuleKind::Domain).unwrap();

    rules.remove_rule("a", 0).unwrap();
    assert!(rules.is_managed("a"));
    rules.remove_rule("a", 0).unwrap();
    assert!(!rules.is_managed("a"));
    assert_eq!(
        rules.remove_rule("a", 0),
        Err(RuleError::UnknownEntity {
            entity: "a".to_owned()
        })
    );
}

#[test]
fn tabs_without_address_and_internal_pages_are_ignored() {
    let mut loading = TabInfo::new("https://github.com/");
    loading.status = TabStatus::Loading;
    let tabs = vec![
        TabInfo {
            url: None,
            status: TabStatus::Complete,
        },
        TabInfo::new("chrome://newtab/"),
        // still loading, but already open
        loading,
    ];
    let set = OpenAddressSet::from_tabs(&tabs, extwake::DEFAULT_INTERNAL_SCHEMES);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["https://github.com/"]);
}

#[test]
fn detailed_report_names_matching_rule() {
    let rules = RuleSetBuilder::new()
        .entity("dev", |e| e.rule("gitlab").rule("github.com"))
        .build();
    let allow = AllowList::new("extwake", ["dev", "pinned"]);
    let report = evaluate_detailed(&rules, &allow, &open(&["https://github.com/x"]));

    match report.reason("dev") {
        Some(DesireReason::RuleMatched { rule, address }) => {
            assert_eq!(rule.as_str(), "github.com");
            assert_eq!(address, "https://github.com/x");
        }
        other => panic!("unexpected reason {other:?}"),
    }
    assert_eq!(report.reason("pinned"), Some(&DesireReason::AllowListed));
    assert_eq!(report.len(), 3);
}

#[tokio::test]
async fn reconcile_against_json_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{
            "rules": {"extA": ["github.com"], "extC": ["/[/"]},
            "whitelist": ["keep"],
            "theme": "dark"
        }"#,
    )
    .unwrap();

    let config = Config::default();
    let store = Arc::new(JsonFileStore::new(&path));
    let tabs = Arc::new(MemoryTabs::with_urls(["https://github.com/foo", "chrome://settings"]));
    let registry = Arc::new(MemoryRegistry::with_entities([
        EntityRecord::new("extA", "Ext A", false),
        EntityRecord::new("extC", "Ext C", true),
        EntityRecord::new("keep", "Keeper", false),
        EntityRecord::new("extwake", "Toggler", true),
    ]));
    let audit = Arc::new(AuditLog::new(store.clone(), config.audit_capacity));
    let reconciler = Reconciler::new(&config, store.clone(), tabs, registry.clone(), audit);

    let report = reconciler.run_pass().await.unwrap();
    assert_eq!(report.changes.len(), 2);
    assert_eq!(registry.is_enabled("extA"), Some(true));
    assert_eq!(registry.is_enabled("extC"), Some(false));
    assert_eq!(registry.is_enabled("keep"), Some(false));

    let logs = store.load_logs().await.unwrap();
    assert_eq!(logs.len(), 2);
    let woke = logs.iter().find(|e| e.target == "Ext A").unwrap();
    assert_eq!(
        woke.details,
        "Triggered by active tabs state (rule 'github.com' matched https://github.com/foo)"
    );

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["theme"], "dark");
    assert_eq!(raw["logs"].as_array().map(Vec::len), Some(2));
    assert!(matches!(
        raw["logs"][0]["action"].as_str(),
        Some("WAKE" | "SLEEP")
    ));

    assert!(reconciler.run_pass().await.unwrap().is_noop());
    assert_eq!(store.load_rules().await.unwrap().whitelist, vec![EntityId::from("keep")]);
}
