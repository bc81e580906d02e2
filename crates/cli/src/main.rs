use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use studyshare_core::config::AppConfig;
use studyshare_core::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_SEARCH_DISPLAY_LIMIT, DEFAULT_TOP_USERS,
};
use studyshare_core::registry::ConfigFileCategoryStore;
use studyshare_core::stats::UserStatsRecord;
use studyshare_core::{Repository, Uploader};
use studyshare_types::{CategoryName, UserId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "studyshare")]
#[command(about = "Shared study-material repository")]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(long, global = true, env = "STUDYSHARE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file and category directories
    Init,
    /// List categories with their index
    Categories,
    /// Register a new category
    AddCategory {
        name: String,
        /// Refuse unless this user id is listed in bot.admin_ids
        #[arg(long)]
        as_user: Option<i64>,
    },
    /// Store a local file under a category
    Upload {
        /// Category name or index
        category: String,
        path: PathBuf,
        /// Stored filename (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        user_name: Option<String>,
    },
    /// Show one page of a category
    List {
        /// Category name or index
        category: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Search filenames and category names
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_DISPLAY_LIMIT)]
        limit: usize,
    },
    /// Copy a stored file out of the repository
    Download {
        /// Category name or index
        category: String,
        filename: String,
        /// Destination (defaults to the stored filename in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a stored file
    Delete {
        /// Category name or index
        category: String,
        filename: String,
        /// Refuse unless this user id is listed in bot.admin_ids
        #[arg(long)]
        as_user: Option<i64>,
    },
    /// Show one user's upload statistics
    Stats { user_id: i64 },
    /// Show the most active uploaders
    Top {
        #[arg(short, default_value_t = DEFAULT_TOP_USERS)]
        n: usize,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("studyshare=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'studyshare --help' for commands");
        return Ok(());
    };

    let config = AppConfig::load_or_init(&cli.config)?
        .with_token_override(std::env::var("TELEGRAM_BOT_TOKEN").ok());
    let base_dir = match cli.config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tracing::debug!("using configuration {}", cli.config.display());
    let repo = Repository::open(
        &config.resolve(&base_dir)?,
        Box::new(ConfigFileCategoryStore::new(&cli.config)),
    )?;

    match command {
        Commands::Init => {
            println!(
                "Configuration at {} with {} categories",
                cli.config.display(),
                repo.categories().len()
            );
        }
        Commands::Categories => {
            for (index, category) in repo.categories().iter().enumerate() {
                println!("{index}: {category}");
            }
        }
        Commands::AddCategory { name, as_user } => {
            require_admin(&config, as_user)?;
            let category = repo.add_category(&name)?;
            println!("Added category: {category}");
        }
        Commands::Upload {
            category,
            path,
            name,
            user_id,
            user_name,
        } => {
            let category = pick_category(&repo, &category)?;
            let name = match name {
                Some(name) => name,
                None => file_name(&path)?,
            };
            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let size = file.metadata()?.len();
            let uploader = Uploader::new(UserId::from(user_id), user_name);

            let outcome = repo.submit_upload(category.as_str(), &name, size, file, &uploader)?;

            println!("Stored {} in {}", outcome.file.name, outcome.category);
            if let Some(remote_id) = outcome.remote_id {
                println!("Mirrored as {remote_id}");
            }
            if let Some(stats) = outcome.stats {
                println!("Uploads by this user: {}", stats.files_uploaded);
            }
        }
        Commands::List { category, page } => {
            let category = pick_category(&repo, &category)?;
            let page = repo.list_category(category.as_str(), page)?;
            let first = page.first_position(repo.page_size());

            println!(
                "{} (page {}/{}, {} files)",
                category, page.page_number, page.total_pages, page.total_items
            );
            if page.items.is_empty() {
                println!("No files found.");
            }
            for (offset, file) in page.items.iter().enumerate() {
                println!(
                    "{}. {} ({})",
                    first + offset,
                    file.name,
                    human_size(file.size_bytes)
                );
            }
        }
        Commands::Search { query, limit } => {
            let hits = repo.search(&query)?;
            if hits.is_empty() {
                println!("No files found.");
            }
            for hit in hits.iter().take(limit) {
                println!("{}/{}", hit.category, hit.file.name);
            }
            if hits.len() > limit {
                println!("... and {} more", hits.len() - limit);
            }
        }
        Commands::Download {
            category,
            filename,
            out,
        } => {
            let category = pick_category(&repo, &category)?;
            let source = repo.resolve_file(category.as_str(), &filename)?;
            let destination = out.unwrap_or_else(|| PathBuf::from(&filename));
            std::fs::copy(&source, &destination)
                .with_context(|| format!("failed to write {}", destination.display()))?;
            println!("Saved {}", destination.display());
        }
        Commands::Delete {
            category,
            filename,
            as_user,
        } => {
            require_admin(&config, as_user)?;
            let category = pick_category(&repo, &category)?;
            repo.delete_file(category.as_str(), &filename)?;
            println!("Deleted {category}/{filename}");
        }
        Commands::Stats { user_id } => {
            let record = repo.user_stats(&UserId::from(user_id))?;
            print_record(&record);
        }
        Commands::Top { n } => {
            let top = repo.top_uploaders(n)?;
            let summary = repo.ledger_summary()?;
            for (rank, record) in top.iter().enumerate() {
                println!(
                    "{}. {} ({})",
                    rank + 1,
                    record.display_name.as_deref().unwrap_or(record.user_id.as_str()),
                    record.files_uploaded
                );
            }
            println!(
                "{} users uploaded {} files",
                summary.users_with_uploads, summary.total_uploads
            );
        }
    }

    Ok(())
}

/// Accepts an exact category name, falling back to a zero-based index.
fn pick_category(repo: &Repository, raw: &str) -> anyhow::Result<CategoryName> {
    let raw = raw.trim();
    if let Some(category) = repo.categories().into_iter().find(|c| c.as_str() == raw) {
        return Ok(category);
    }
    match raw.parse::<usize>() {
        Ok(index) => Ok(repo.category_at(index)?),
        Err(_) => bail!("category not found: {raw}"),
    }
}

fn require_admin(config: &AppConfig, as_user: Option<i64>) -> anyhow::Result<()> {
    match as_user {
        Some(id) if !config.is_admin(id) => bail!("user {id} is not an administrator"),
        _ => Ok(()),
    }
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("no usable filename in {}", path.display()))
}

fn print_record(record: &UserStatsRecord) {
    println!("User: {}", record.user_id);
    if let Some(name) = &record.display_name {
        println!("Name: {name}");
    }
    println!("Files uploaded: {}", record.files_uploaded);
    match record.last_activity {
        Some(at) => println!("Last activity: {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("Last activity: unknown"),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
