//! cloudblock: manage and query the blocked IP range collection.

use clap::{Parser, Subcommand};
use cloudblock::{Config, SharedRangeCache};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

#[derive(Parser)]
#[command(name = "cloudblock")]
#[command(version)]
#[command(about = "Maintain and query blocked cloud provider IP ranges", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether IP addresses are excluded
    Check {
        /// Addresses to check
        #[arg(required = true)]
        ips: Vec<String>,
    },

    /// Ban a single IP address
    Ban {
        /// Address to ban
        ip: String,
    },

    /// Rebuild the collection from the provider feeds
    Update {
        /// Only update when the configured refresh interval has elapsed
        #[arg(long)]
        if_needed: bool,
    },

    /// Remove every blocked range
    Clear,

    /// Print the stored collection
    List {
        /// Only print this index key's bucket (e.g. "10.")
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Show information about the last refresh
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> cloudblock::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let store = Arc::new(config.open_store()?);
    let shared = Arc::new(SharedRangeCache::new());
    let ranges = config.build(store.clone(), shared.clone())?;

    match cli.command {
        Commands::Check { ips } => {
            shared.reload(store.as_ref())?;
            let request = ranges.request();
            for ip in ips {
                let verdict = if request.is_excluded(&ip) {
                    "excluded"
                } else {
                    "not excluded"
                };
                println!("{}\t{}", ip, verdict);
            }
        }
        Commands::Ban { ip } => {
            let updated = ranges.ban_ip(&ip)?;
            println!("Banned {} ({} blocked entries)", ip, updated.len());
        }
        Commands::Update { if_needed } => {
            if if_needed {
                if !ranges.update_if_needed(config.refresh_interval())? {
                    println!("Blocked ranges are up to date");
                    return Ok(());
                }
            } else {
                ranges.update_blocked_ip_ranges()?;
            }
            let stored = ranges.blocked_ranges()?;
            println!(
                "Stored {} ranges in {} buckets",
                stored.len(),
                stored.bucket_count()
            );
        }
        Commands::Clear => {
            ranges.unset_all_ip_ranges()?;
            println!("Cleared all blocked ranges");
        }
        Commands::List { key } => {
            let stored = ranges.blocked_ranges()?;
            for (bucket_key, entries) in stored.buckets() {
                if key.as_deref().map_or(true, |k| k == bucket_key) {
                    for entry in entries {
                        println!("{}", entry);
                    }
                }
            }
        }
        Commands::Status => {
            let meta = ranges.last_refresh()?;
            let stored = ranges.blocked_ranges()?;
            match meta.last_updated {
                Some(t) => println!(
                    "Last refresh: {} (unix seconds)",
                    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
                ),
                None => println!("Last refresh: never"),
            }
            println!("Entries at last refresh: {}", meta.entry_count);
            println!(
                "Fingerprint: {}",
                meta.fingerprint.as_deref().unwrap_or("-")
            );
            println!(
                "Stored now: {} entries in {} buckets",
                stored.len(),
                stored.bucket_count()
            );
            println!("Sources: {}", ranges.source_names().join(", "));
        }
    }

    Ok(())
}
