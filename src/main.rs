use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use stockcat_lib::categories::{CategorySet, Tier};
use stockcat_lib::config::{AppConfig, Overrides};
use stockcat_lib::model::StockCard;
use stockcat_lib::{App, AppError};

/// Exit code used when a deletion is refused because products still use the category.
const IN_USE_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "stockcat", about = "Stock categories and product cards", version)]
struct Cli {
    /// SQLite database used when no remote URL is configured.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Fallback cache file.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,
    /// Base URL of the HTTP backend.
    #[arg(long, global = true)]
    remote: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect and edit the category tree.
    #[command(subcommand)]
    Categories(CategoryCommand),
    /// Inspect stock cards.
    #[command(subcommand)]
    StockCards(StockCardCommand),
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    /// Print the category tree.
    List {
        /// Emit the raw category set as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Create a main category, or a sub-category with --parent.
    Create {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a category and its sub-categories when no product uses it.
    Delete { id: String },
    /// Materialize categories referenced by inventory records.
    Sync,
    /// Count products that use a category.
    Usage { id: String },
}

#[derive(Debug, Subcommand)]
enum StockCardCommand {
    List {
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = AppConfig::from_env_with(Overrides {
        database_path: cli.db,
        cache_path: cli.cache,
        remote_url: cli.remote,
    })
    .context("resolve configuration")?;

    let _log_guard = match stockcat_lib::init_file_logging(&config.log_dir(), &config.log_filter) {
        Ok(guard) => Some(guard),
        Err(err) => {
            stockcat_lib::init_logging();
            tracing::warn!(target: "stockcat", event = "file_logging_unavailable", error = %err);
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    runtime.block_on(async move {
        let app = App::open(config).await?;
        match cli.command {
            Commands::Categories(command) => handle_categories(&app, command).await,
            Commands::StockCards(command) => handle_stock_cards(&app, command).await,
        }
    })
}

async fn handle_categories(app: &App, command: CategoryCommand) -> Result<i32> {
    let repo = &app.categories;
    match command {
        CategoryCommand::List { json } => {
            let set = repo.load().await;
            if json {
                let serialized =
                    serde_json::to_string_pretty(&set).context("serialize category set")?;
                println!("{serialized}");
            } else {
                print_tree(&set);
            }
            Ok(0)
        }
        CategoryCommand::Create { name, parent } => {
            match repo.create(&name, parent.as_deref()).await {
                Ok(set) => {
                    let created = set
                        .categories
                        .iter()
                        .find(|c| c.name == name.trim() && c.parent_id == parent);
                    match created {
                        Some(category) => println!("Created {} ({})", category.name, category.id),
                        None => println!("Created {}", name.trim()),
                    }
                    print_source(&set);
                    Ok(0)
                }
                Err(err) => Ok(report(&err)),
            }
        }
        CategoryCommand::Delete { id } => match repo.delete(&id).await {
            Ok(set) => {
                println!("Deleted {id}");
                print_source(&set);
                Ok(0)
            }
            Err(err) => Ok(report(&err)),
        },
        CategoryCommand::Sync => {
            let materialized = repo.sync().await;
            println!("Materialized {materialized} categories");
            Ok(0)
        }
        CategoryCommand::Usage { id } => match repo.usage(&id).await {
            Ok(usage) => {
                let payload = json!({
                    "categoryId": usage.category_id,
                    "count": usage.count,
                    "source": usage.source,
                });
                println!("{payload}");
                Ok(0)
            }
            Err(err) => Ok(report(&err)),
        },
    }
}

async fn handle_stock_cards(app: &App, command: StockCardCommand) -> Result<i32> {
    match command {
        StockCardCommand::List { json } => match app.stock_cards.list().await {
            Ok(cards) => {
                if json {
                    let serialized =
                        serde_json::to_string_pretty(&cards).context("serialize stock cards")?;
                    println!("{serialized}");
                } else {
                    let set = app.categories.view().await;
                    print_cards(&cards, &set);
                }
                Ok(0)
            }
            Err(err) => Ok(report(&err)),
        },
    }
}

fn report(err: &AppError) -> i32 {
    eprintln!("Error: {}: {}", err.code(), err.message());
    if err.code() == "CATEGORY/IN_USE" {
        IN_USE_EXIT_CODE
    } else {
        1
    }
}

fn print_source(set: &CategorySet) {
    if set.source == Tier::Fallback {
        println!("(server unreachable; saved on this device)");
    }
}

fn print_tree(set: &CategorySet) {
    let tree = set.tree();
    if tree.is_empty() {
        println!("No categories.");
    }
    for root in tree.roots() {
        println!("{}  {}", root.id, root.name);
        for child in tree.children_of(&root.id) {
            println!("  └ {}  {}", child.id, child.name);
        }
    }
    print_source(set);
}

fn print_cards(cards: &[StockCard], set: &CategorySet) {
    if cards.is_empty() {
        println!("No stock cards.");
        return;
    }
    let tree = set.tree();
    for card in cards {
        let category = card
            .category_id
            .as_deref()
            .map(|id| tree.label(id).unwrap_or_else(|| id.to_string()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<32} {:<6} {}",
            card.barcode, card.name, card.unit, category
        );
    }
}
