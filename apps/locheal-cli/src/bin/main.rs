use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use locheal_core::captures::{load_captures, read_page_source};
use locheal_core::config::{expand_path, Config};
use locheal_core::page::{analyze_page, detect_automation_type};
use locheal_core::types::AutomationType;
use locheal_rag::RetrievalEngine;
use locheal_xpath::{LocalHealer, LocatorValidator, SxdEngine, XPathCandidates};

#[derive(Parser, Debug)]
#[command(author, version, about = "Locator self-healing toolkit", long_about = None)]
struct Args {
    /// Directory holding locheal.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a locator resolves on a page
    Present {
        locator: String,
        page: String,
        /// WEB, MOBILE_ANDROID, MOBILE_IOS or UNKNOWN; detected when omitted
        #[arg(long)]
        automation_type: Option<AutomationType>,
    },
    /// Turn a locator into an XPath that resolves on the page
    Ensure { locator: String, page: String },
    /// Heal a broken locator without a model
    Heal { locator: String, page: String },
    /// Structural inventory of a page
    Analyze { page: String },
    /// Print the context that would be sent to a model
    Context { locator: String, page: String },
    /// Compression statistics and a retrieval report
    Stats { locator: String, page: String },
    /// Check and heal a locator against every capture under a directory
    Scan { locator: String, dir: String },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_page(page: &str) -> anyhow::Result<String> {
    let path = expand_path(page);
    read_page_source(&path).map_err(|e| anyhow::anyhow!("Failed to read page source {}: {}", path.display(), e))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn scan(locator: &str, dir: &Path, healer: &LocalHealer) -> anyhow::Result<Value> {
    let validator: LocatorValidator = LocatorValidator::default();
    let captures = load_captures(dir)?;
    tracing::info!("Scanning {} captures under {}", captures.len(), dir.display());
    let rows: Vec<Value> = captures
        .iter()
        .map(|capture| {
            let present = validator.is_locator_present(locator, &capture.source, capture.automation_type);
            let healed = healer.heal_locator(locator, &capture.source);
            json!({
                "path": capture.path.display().to_string(),
                "automation_type": capture.automation_type,
                "present": present,
                "healed_xpath": healed.healed_xpath,
                "confidence": healed.confidence,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load_from(&args.config_dir).map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let healer = LocalHealer::new(SxdEngine, config.healer()?);
    let retrieval = RetrievalEngine::from_config(&config)?;

    match args.command {
        Commands::Present { locator, page, automation_type } => {
            let source = read_page(&page)?;
            let automation_type = automation_type.unwrap_or_else(|| detect_automation_type(&source));
            let validator: LocatorValidator = LocatorValidator::default();
            let present = validator.is_locator_present(&locator, &source, automation_type);
            print_json(&json!({ "locator": locator, "automation_type": automation_type, "present": present }))?;
        }
        Commands::Ensure { locator, page } => {
            let source = read_page(&page)?;
            let candidates: XPathCandidates = XPathCandidates::default();
            let xpath = candidates.ensure_xpath(&locator, &source);
            print_json(&json!({ "locator": locator, "xpath": xpath }))?;
        }
        Commands::Heal { locator, page } => {
            let source = read_page(&page)?;
            print_json(&serde_json::to_value(healer.heal_locator(&locator, &source))?)?;
        }
        Commands::Analyze { page } => {
            let source = read_page(&page)?;
            print_json(&serde_json::to_value(analyze_page(&source))?)?;
        }
        Commands::Context { locator, page } => {
            let source = read_page(&page)?;
            println!("{}", retrieval.retrieve_relevant_context(&locator, &source));
        }
        Commands::Stats { locator, page } => {
            let source = read_page(&page)?;
            let stats = retrieval.get_context_stats(&locator, &source);
            let report = retrieval.report(&locator, &source);
            print_json(&json!({
                "stats": stats,
                "compression_achieved_percent": stats.compression_achieved(),
                "report": report,
            }))?;
        }
        Commands::Scan { locator, dir } => {
            let dir = expand_path(&dir);
            print_json(&scan(&locator, &dir, &healer)?)?;
        }
    }
    Ok(())
}
