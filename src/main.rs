//! lumina CLI: catalog service core.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use lumina::config::LibraryConfig;
use lumina::engine::Library;
use lumina::llm::{OllamaClient, OllamaConfig, TextCapability};
use lumina::model::Preference;

#[derive(Parser)]
#[command(name = "lumina", version, about = "Catalog service core")]
struct Cli {
    /// Data directory for the persistent catalog.
    #[arg(long, global = true, default_value = ".lumina")]
    data_dir: PathBuf,

    /// Optional TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a catalog item from a text file and enrich it.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        /// Path to the item's raw text.
        #[arg(long)]
        file: PathBuf,
    },

    /// List all items with their enrichment state.
    List,

    /// Remove an item.
    Remove { item_id: u64 },

    /// Borrow an item.
    Borrow {
        #[arg(long)]
        user: u64,
        item_id: u64,
    },

    /// Return a borrowed item.
    Return {
        #[arg(long)]
        user: u64,
        item_id: u64,
    },

    /// Post a review (1-5 stars) and classify its sentiment.
    Review {
        #[arg(long)]
        user: u64,
        item_id: u64,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },

    /// Show reviews for an item.
    Reviews { item_id: u64 },

    /// Record a topic preference for a user.
    Prefer {
        #[arg(long)]
        user: u64,
        tag: String,
    },

    /// Content-based recommendations for a user.
    Recommend {
        #[arg(long)]
        user: u64,
    },

    /// Re-submit enrichment for entities still missing derived text.
    Reenrich,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => LibraryConfig::load(path)?,
        None => LibraryConfig::default(),
    };
    if config.data_dir.is_none() {
        config.data_dir = Some(cli.data_dir.clone());
    }

    let client = OllamaClient::new(config.ollama.clone());
    if !client.probe() {
        tracing::warn!(
            "Ollama is unreachable at {}; enrichment jobs will dead-letter",
            config.ollama.base_url
        );
    }
    let capability: Arc<dyn TextCapability> = Arc::new(client);
    let library = Library::new(config, capability)?;

    match cli.command {
        Commands::Add {
            title,
            author,
            file,
        } => {
            let text = std::fs::read_to_string(&file).into_diagnostic()?;
            let item = library.add_item(title, author, text)?;
            println!("Added item {} \"{}\" (enriching in background)", item.id, item.title);
        }

        Commands::List => {
            for item in library.items() {
                let state = match item.summary.value() {
                    Some(summary) => summary.clone(),
                    None => format!("{:?}", item.summary),
                };
                println!("{:>4}  {} — {}\n      {}", item.id, item.title, item.author, state);
            }
        }

        Commands::Remove { item_id } => {
            let removed = library.remove_item(item_id)?;
            println!("Removed item {} \"{}\"", removed.id, removed.title);
        }

        Commands::Borrow { user, item_id } => {
            library.borrow_item(user, item_id)?;
            println!("User {user} borrowed item {item_id}");
        }

        Commands::Return { user, item_id } => {
            library.return_item(user, item_id)?;
            println!("User {user} returned item {item_id}");
        }

        Commands::Review {
            user,
            item_id,
            rating,
            comment,
        } => {
            let review = library.post_review(user, item_id, rating, comment)?;
            println!(
                "Review {} stored ({} stars, sentiment pending)",
                review.id, review.rating
            );
        }

        Commands::Reviews { item_id } => {
            for review in library.reviews(item_id) {
                let sentiment = review
                    .sentiment
                    .value()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                println!(
                    "{:>4}  user {}  {}★  [{}]  {}",
                    review.id, review.user_id, review.rating, sentiment, review.comment
                );
            }
        }

        Commands::Prefer { user, tag } => {
            library.add_preference(user, Preference::TopicTag { tag: tag.clone() })?;
            println!("User {user} now prefers \"{tag}\"");
        }

        Commands::Recommend { user } => {
            let picks = library.recommendations(user);
            if picks.is_empty() {
                println!("No recommendations yet — enrich some items first.");
            }
            for item in picks {
                println!("{:>4}  {} — {}", item.id, item.title, item.author);
            }
        }

        Commands::Reenrich => {
            let submitted = library.reenrich_pending();
            println!("Re-submitted {submitted} enrichment job(s)");
        }
    }

    // Drain outstanding enrichment before the process exits; the catalog
    // flushes each write-back to disk as it lands.
    library.shutdown();
    Ok(())
}
