mod cli;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shelf::config::ShelfConfig;
use shelf::library::RawFilter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelf", version, about = "Personal reading-library server")]
struct Cli {
    /// Config file (defaults to ~/.shelf/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Print one page of a reader's library
    Library(LibraryArgs),
    /// Import publications from a JSON file into a reader's library
    Import {
        /// Auth subject of the reader (created if missing)
        #[arg(long)]
        reader: String,
        file: PathBuf,
    },
    /// Check database integrity and print row counts
    Doctor,
}

#[derive(Args)]
struct LibraryArgs {
    /// Auth subject of the reader
    #[arg(long)]
    reader: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    attribution: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long = "type")]
    publication_type: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long)]
    collection: Option<String>,
    #[arg(long)]
    workspace: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// title | datePublished (default: most recently updated first)
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long)]
    reverse: bool,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    offset: Option<usize>,
    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

impl LibraryArgs {
    fn filter(&self) -> RawFilter {
        RawFilter {
            title: self.title.clone(),
            author: self.author.clone(),
            attribution: self.attribution.clone(),
            role: self.role.clone(),
            publication_type: self.publication_type.clone(),
            workspace: self.workspace.clone(),
            language: self.language.clone(),
            keyword: self.keyword.clone(),
            collection: self.collection.clone(),
            search: self.search.clone(),
            order_by: self.order_by.clone(),
            reverse: self.reverse.then(|| "true".to_string()),
            limit: self.limit.map(|n| n.to_string()),
            offset: self.offset.map(|n| n.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ShelfConfig::load_from(path)?,
        None => ShelfConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => shelf::server::serve(config).await?,
        Command::Library(args) => {
            cli::library::library(&config, &args.reader, &args.filter(), args.json)?
        }
        Command::Import { reader, file } => cli::import::import(&config, &reader, &file)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
