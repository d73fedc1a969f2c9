use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use extwake::{
    AuditLog, Config, EntityId, ExtwakeError, JsonFileStore, OpenAddressSet, RuleError, RuleKind,
    Store, evaluate_detailed, load_rules,
};

const DEFAULT_STORE_FILE: &str = "extwake.json";

#[derive(Debug, Parser)]
#[command(name = "extwake", version, about = "Manage extension auto-toggle rules")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "EXTWAKE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON state file; overrides `store_path` from the config.
    #[arg(long, global = true, env = "EXTWAKE_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect and edit per-extension rules.
    #[command(subcommand)]
    Rules(RulesCommand),
    /// Extensions that are never auto-disabled.
    #[command(subcommand)]
    Allow(AllowCommand),
    /// Inspect the audit log.
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Print which extensions would be enabled for the given open tabs.
    Desired(DesiredArgs),
}

#[derive(Debug, Subcommand)]
enum RulesCommand {
    List,
    Add {
        id: String,
        rule: String,
        /// Treat the rule as a regular expression.
        #[arg(long)]
        regex: bool,
    },
    /// Remove one rule, or every rule of the extension when no index is given.
    Remove {
        id: String,
        index: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
enum AllowCommand {
    List,
    Add { id: String },
    Remove { id: String },
}

#[derive(Debug, Subcommand)]
enum LogsCommand {
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    Clear,
}

#[derive(Debug, Args)]
struct DesiredArgs {
    /// An open tab address; repeat for several tabs.
    #[arg(long = "url", required = true)]
    urls: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("EXTWAKE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExtwakeError> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let store_path = cli
        .store
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE));
    debug!(store = %store_path.display(), "using store");
    let store = JsonFileStore::new(store_path);

    match cli.command {
        Commands::Rules(cmd) => rules(&store, cmd).await,
        Commands::Allow(cmd) => allow(&store, cmd).await,
        Commands::Logs(cmd) => logs(store, &config, cmd).await,
        Commands::Desired(args) => desired(&store, &config, args).await,
    }
}

async fn rules(store: &JsonFileStore, cmd: RulesCommand) -> Result<(), ExtwakeError> {
    let mut rules = store.load_rules().await?.rules;
    match cmd {
        RulesCommand::List => {
            for (id, entity_rules) in rules.iter() {
                println!("{id}");
                for (index, rule) in entity_rules.iter().enumerate() {
                    let note = if rule.is_valid() { "" } else { "  (invalid)" };
                    println!("  [{index}] {:<6} {rule}{note}", rule.kind().to_string());
                }
            }
        }
        RulesCommand::Add { id, rule, regex } => {
            let kind = if regex { RuleKind::Regex } else { RuleKind::Domain };
            let added = rules.add_rule(&id, &rule, kind)?.to_string();
            store.save_rules(&rules).await?;
            println!("added {added} to {id}");
        }
        RulesCommand::Remove {
            id,
            index: Some(index),
        } => {
            let removed = rules.remove_rule(&id, index)?;
            store.save_rules(&rules).await?;
            if rules.is_managed(&id) {
                println!("removed {removed} from {id}");
            } else {
                println!("removed {removed}; {id} is no longer managed");
            }
        }
        RulesCommand::Remove { id, index: None } => {
            let removed = rules
                .remove_entity(&id)
                .ok_or_else(|| RuleError::UnknownEntity { entity: id.clone() })?;
            store.save_rules(&rules).await?;
            println!("removed {} rules; {id} is no longer managed", removed.len());
        }
    }
    Ok(())
}

async fn allow(store: &JsonFileStore, cmd: AllowCommand) -> Result<(), ExtwakeError> {
    let mut whitelist = store.load_rules().await?.whitelist;
    match cmd {
        AllowCommand::List => {
            for id in &whitelist {
                println!("{id}");
            }
        }
        AllowCommand::Add { id } => {
            let id = EntityId::from(id);
            if !whitelist.contains(&id) {
                whitelist.push(id);
                store.save_whitelist(&whitelist).await?;
            }
        }
        AllowCommand::Remove { id } => {
            whitelist.retain(|entry| entry.as_str() != id);
            store.save_whitelist(&whitelist).await?;
        }
    }
    Ok(())
}

async fn logs(store: JsonFileStore, config: &Config, cmd: LogsCommand) -> Result<(), ExtwakeError> {
    let audit = AuditLog::new(std::sync::Arc::new(store), config.audit_capacity);
    match cmd {
        LogsCommand::List { limit } => {
            let entries = audit.list().await?;
            for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{entry}");
            }
        }
        LogsCommand::Clear => audit.clear().await?,
    }
    Ok(())
}

async fn desired(
    store: &JsonFileStore,
    config: &Config,
    args: DesiredArgs,
) -> Result<(), ExtwakeError> {
    let self_id = EntityId::from(config.self_id.as_str());
    let loaded = load_rules(store, &self_id).await?;
    let tabs: Vec<extwake::TabInfo> = args.urls.into_iter().map(extwake::TabInfo::new).collect();
    let addresses = OpenAddressSet::from_tabs(&tabs, &config.internal_schemes);

    let report = evaluate_detailed(&loaded.rules, &loaded.allow_list, &addresses);
    for (id, reason) in report.iter() {
        println!("{id}: {reason}");
    }
    for id in loaded.rules.entity_ids() {
        if !report.contains(id.as_str()) {
            println!("{id}: disabled (no matching tabs)");
        }
    }
    Ok(())
}
