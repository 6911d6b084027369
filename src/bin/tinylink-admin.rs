use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tinylink::config::Config;
use tinylink::service::{LinkService, ServiceError};
use tinylink::storage;

#[derive(Parser)]
#[command(name = "tinylink-admin")]
#[command(about = "tinylink maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete every expired link together with its visits
    PurgeExpired,
    /// List the links owned by a session
    List {
        /// Session ID (value of the session cookie before the signature)
        session_id: String,
        /// Maximum number of links to show
        #[arg(long, default_value_t = 25)]
        limit: i64,
    },
    /// Show visit statistics for a link
    Stats {
        /// Manage code of the link
        manage_code: String,
    },
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn print_table(title: &str, table: &tinylink::analytics::FrequencyTable) {
    println!("{}:", title);
    if table.is_empty() {
        println!("  (none)");
        return;
    }

    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (key, count) in rows {
        println!("  {:<40} {}", key, count);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;
    let service = LinkService::new(storage).with_analytics(false);

    match cli.command {
        Commands::PurgeExpired => {
            let purged = service.purge_expired(Utc::now()).await?;
            println!("✓ Purged {} expired link(s)", purged);
        }
        Commands::List { session_id, limit } => {
            let urls = service.list_mine(&session_id, limit).await?;
            if urls.is_empty() {
                println!("No links found for session '{}'.", session_id);
            } else {
                println!(
                    "{:<8} {:<8} {:<20} {:>7}  {}",
                    "Short", "Manage", "Created", "Visits", "Original URL"
                );
                println!("{}", "-".repeat(80));
                for url in urls {
                    println!(
                        "{:<8} {:<8} {:<20} {:>7}  {}",
                        url.short_code,
                        url.manage_code,
                        format_millis(url.created_at),
                        url.total_visits,
                        url.original_url
                    );
                }
            }
        }
        Commands::Stats { manage_code } => match service.info(&manage_code).await {
            Ok(stats) => {
                println!("Short code:   {}", stats.url.short_code);
                println!("Original URL: {}", stats.url.original_url);
                println!("Created:      {}", format_millis(stats.url.created_at));
                match stats.url.delete_after_minutes {
                    Some(m) => println!("Expires:      {} minute(s) after creation", m),
                    None => println!("Expires:      never"),
                }
                println!("Total visits: {}", stats.total_visits);
                println!();
                print_table("Countries", &stats.tables.countries);
                print_table("Referers", &stats.tables.referers);
                print_table("Browsers", &stats.tables.browsers);
            }
            Err(ServiceError::NotFound) => {
                println!("⚠ No link with manage code '{}'", manage_code);
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}
