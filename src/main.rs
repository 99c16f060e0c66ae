mod cli;

use anyhow::Result;
use clap::Parser;
use gigboard::activity::ActivityLog;
use gigboard::config::{self, ProviderKind};
use gigboard::filter::FilterCriteria;
use gigboard::session::build_provider;
use gigboard::store::{FileStore, KeyValueStore, MemoryStore};
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gigboard", about = "A freelance job marketplace in your terminal")]
pub struct Args {
    #[arg(short, long = "command", value_name = "CMD", action = clap::ArgAction::Append, help = "Run a shell command and exit (repeatable)")]
    pub commands: Vec<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "GIGBOARD_DATA_DIR", help = "Where session state is stored")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Session provider: local, remote")]
    pub provider: Option<String>,

    #[arg(long, env = "GIGBOARD_IDENTITY_URL", help = "Identity service base URL")]
    pub identity_url: Option<String>,

    #[arg(long, help = "Keep session state in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Activity log directory")]
    pub activity_dir: Option<PathBuf>,

    #[arg(long, help = "Verbose output (print commands and job summaries)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let root = std::env::current_dir()?;

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load(&root)?
    };

    // CLI overrides
    if let Some(name) = &args.provider {
        cfg.auth.provider = ProviderKind::from_str(name).ok_or_else(|| {
            anyhow::anyhow!("Invalid provider: {}. Use: local, remote", name)
        })?;
    }
    if let Some(url) = &args.identity_url {
        cfg.identity.base_url = url.clone();
    }
    if let Some(dir) = &args.data_dir {
        cfg.data_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error: {}", e);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} problem{})",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
    }

    let data_dir = cfg.data_dir(&root);
    if args.debug {
        eprintln!("[DEBUG] Provider: {}", cfg.auth.provider.as_str());
        eprintln!("[DEBUG] Data dir: {}", data_dir.display());
        eprintln!("[DEBUG] Identity URL: {}", cfg.identity.base_url);
        eprintln!("[DEBUG] Demo accounts: {}", cfg.auth.demo_accounts.len());
        eprintln!("[DEBUG] Allow any email: {}", cfg.auth.allow_any_email);
    }

    let store: Box<dyn KeyValueStore> = if args.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::open(&data_dir)?)
    };
    let session = build_provider(&cfg, store, args.debug);
    let catalog = gigboard::fixtures::load_catalog(&cfg.fixtures)?;

    let activity_dir = args
        .activity_dir
        .clone()
        .unwrap_or_else(|| root.join(".gigboard").join("activity"));
    let run_id = uuid::Uuid::new_v4().to_string();
    let mut activity = ActivityLog::new(&activity_dir.join(format!("{}.jsonl", run_id)), &run_id)?;
    activity.run_start(session.kind())?;

    if args.verbose || args.debug {
        eprintln!(
            "[VERBOSE] Loaded {} jobs, {} categories, {} users",
            catalog.jobs().len(),
            catalog.categories().len(),
            catalog.users().len()
        );
        if let Some(profile) = session.current() {
            eprintln!("[VERBOSE] Resumed session for {}", profile.email);
        }
    }

    let ctx = cli::Context {
        args,
        root,
        config: RefCell::new(cfg),
        catalog: RefCell::new(catalog),
        session: RefCell::new(session),
        activity: RefCell::new(activity),
        criteria: RefCell::new(FilterCriteria::default()),
    };

    if !ctx.args.commands.is_empty() {
        let commands = ctx.args.commands.clone();
        cli::run_once(&ctx, &commands)
    } else {
        cli::run_repl(ctx)
    }
}
