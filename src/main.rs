use anyhow::{Context, Result};
use assetkit::{
    config::Config,
    enricher::{Enricher, EnrichmentListener, EnrichmentOutcome},
    llm::TextGenerationClient,
    models::{Asset, AssetEvent, AssetFilter, AssetId, AssetPatch, FileRef, FileType, NewAsset, WriteOperation, WriteOrigin},
    slug,
    store::{LocalStore, Store},
    tagger::TagReconciler,
    utils,
};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "assetkit")]
#[command(about = "Media asset library that writes titles, alt text and tags for your uploads")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the standard search paths)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Store snapshot file (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file as a new asset and enrich it
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Asset type (inferred from the extension when omitted)
        #[arg(long)]
        file_type: Option<FileType>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        alt_text: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Credit or origin of the media
        #[arg(long)]
        source: Option<String>,
        /// Tag name to attach (repeatable)
        #[arg(long = "tag", value_name = "NAME")]
        tags: Vec<String>,
        #[arg(long)]
        uploaded_by: Option<String>,
    },
    /// Replace the file behind an asset and re-enrich it
    Replace {
        #[arg(value_name = "ID")]
        id: AssetId,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Edit descriptive fields (never triggers enrichment)
    Edit {
        #[arg(value_name = "ID")]
        id: AssetId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        alt_text: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Upload every file under a directory
    Import {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        /// Number of enrichments running at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long)]
        uploaded_by: Option<String>,
    },
    /// Print one asset
    Show {
        #[arg(value_name = "ID")]
        id: AssetId,
    },
    /// List assets, optionally narrowed by tag or text
    List {
        /// Only assets with this tag (slug or name)
        #[arg(long)]
        tag: Option<String>,
        /// Text to look for in title, description, alt text and file name
        #[arg(long)]
        search: Option<String>,
    },
    /// List all tags
    Tags,
    /// Print the slug a tag name normalizes to
    Slug {
        #[arg(value_name = "TEXT")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assetkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_default(),
    };

    if let Commands::Slug { text } = &cli.command {
        println!("{}", slug::normalize(text));
        return Ok(());
    }

    let store_path = cli.store.clone().unwrap_or_else(|| config.store.resolved_path());
    let store = Arc::new(
        LocalStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to open store: {}", store_path.display()))?,
    );
    let client = Arc::new(TextGenerationClient::from_config(&config));
    let enricher = Arc::new(Enricher::new(store.clone(), client));

    match cli.command {
        Commands::Upload {
            file,
            file_type,
            title,
            alt_text,
            description,
            source,
            tags,
            uploaded_by,
        } => {
            let mut asset = new_asset(&file, file_type)?;
            if let Some(title) = title {
                asset = asset.with_title(title);
            }
            if let Some(alt_text) = alt_text {
                asset = asset.with_alt_text(alt_text);
            }
            if let Some(description) = description {
                asset = asset.with_description(description);
            }
            if let Some(source) = source {
                asset = asset.with_source(source);
            }
            if let Some(actor) = uploaded_by {
                asset = asset.uploaded_by(actor);
            }
            if !tags.is_empty() {
                let ids = TagReconciler::new(store.clone()).resolve(&tags).await?;
                asset = asset.with_tags(ids);
            }

            let listener = EnrichmentListener::new(enricher.clone()).spawn(store.subscribe());
            let created = store.create_asset(asset).await?;
            listener.shutdown().await;

            let asset = reload(store.as_ref(), created.id).await?;
            print_asset(store.as_ref(), &asset).await?;
        }
        Commands::Replace { id, file } => {
            let filename = file_name(&file)?;
            let patch = AssetPatch {
                file: Some(FileRef::dated(filename, chrono::Local::now().date_naive())),
                ..AssetPatch::default()
            };

            let listener = EnrichmentListener::new(enricher.clone()).spawn(store.subscribe());
            store.update_asset(id, patch, WriteOrigin::User).await?;
            listener.shutdown().await;

            let asset = reload(store.as_ref(), id).await?;
            print_asset(store.as_ref(), &asset).await?;
        }
        Commands::Edit {
            id,
            title,
            alt_text,
            description,
        } => {
            let patch = AssetPatch {
                title,
                alt_text,
                description,
                ..AssetPatch::default()
            };
            if patch.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }

            let asset = store.update_asset(id, patch, WriteOrigin::User).await?;
            print_asset(store.as_ref(), &asset).await?;
        }
        Commands::Import {
            dir,
            concurrency,
            uploaded_by,
        } => {
            import(store, enricher, &dir, concurrency.max(1), uploaded_by).await?;
        }
        Commands::Show { id } => {
            let asset = reload(store.as_ref(), id).await?;
            print_asset(store.as_ref(), &asset).await?;
        }
        Commands::List { tag, search } => {
            let filter = AssetFilter { tag_slug: tag, search };
            let assets = store.find_assets(&filter).await?;
            if assets.is_empty() {
                println!("No assets.");
            }
            for asset in assets {
                println!(
                    "{}  {:<7} {}  {}",
                    asset.id,
                    asset.file_type.to_string(),
                    asset.file.as_str(),
                    asset.title.as_deref().unwrap_or("(untitled)")
                );
            }
        }
        Commands::Tags => {
            let tags = store.find_tags().await?;
            if tags.is_empty() {
                println!("No tags.");
            }
            for tag in tags {
                println!("{:<24} {}", tag.slug, tag.name);
            }
        }
        Commands::Slug { .. } => {}
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Not a valid file name: {}", path.display()))
}

/// Build the upload record for a local file. The stored reference is dated
/// by upload day.
fn new_asset(path: &Path, file_type: Option<FileType>) -> Result<NewAsset> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Not a file: {}", path.display());
    }

    let filename = file_name(path)?;
    let file_type = file_type.unwrap_or_else(|| utils::infer_file_type(path));
    let file = FileRef::dated(filename, chrono::Local::now().date_naive());
    Ok(NewAsset::new(file, file_type))
}

async fn reload(store: &dyn Store, id: AssetId) -> Result<Asset> {
    store
        .get_asset(id)
        .await?
        .with_context(|| format!("No asset with id {}", id))
}

async fn print_asset(store: &dyn Store, asset: &Asset) -> Result<()> {
    let tags = store.find_tags().await?;
    let names: Vec<&str> = asset
        .tags
        .iter()
        .filter_map(|id| tags.iter().find(|t| t.id == *id))
        .map(|t| t.name.as_str())
        .collect();

    println!("id:          {}", asset.id);
    println!("file:        {}", asset.file.as_str());
    println!("type:        {}", asset.file_type);
    println!("title:       {}", asset.title.as_deref().unwrap_or(""));
    println!("alt text:    {}", asset.alt_text.as_deref().unwrap_or(""));
    println!("description: {}", asset.description.as_deref().unwrap_or(""));
    println!("tags:        {}", names.join(", "));
    if let Some(source) = &asset.source {
        println!("source:      {}", source);
    }
    if let Some(actor) = &asset.uploaded_by {
        println!("uploaded by: {}", actor);
    }
    Ok(())
}

async fn import(
    store: Arc<LocalStore>,
    enricher: Arc<Enricher>,
    dir: &Path,
    concurrency: usize,
    uploaded_by: Option<String>,
) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        println!("No files found in {}", dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} assets ({msg})")?
            .progress_chars("#>-"),
    );

    let mut enriched = 0usize;
    let mut unchanged = 0usize;
    let mut failed = 0usize;

    let mut results = stream::iter(files)
        .map(|path| {
            let store = store.clone();
            let enricher = enricher.clone();
            let uploaded_by = uploaded_by.clone();
            async move {
                let mut asset = new_asset(&path, None)?;
                if let Some(actor) = uploaded_by {
                    asset = asset.uploaded_by(actor);
                }
                let created = store.create_asset(asset).await?;
                let event = AssetEvent {
                    operation: WriteOperation::Create,
                    current: created,
                    previous: None,
                    origin: WriteOrigin::User,
                };
                Ok::<_, anyhow::Error>((path, enricher.handle(&event).await))
            }
        })
        .buffer_unordered(concurrency);

    while let Some(result) = results.next().await {
        match result {
            Ok((path, outcome)) => {
                pb.set_message(path.display().to_string());
                match outcome {
                    EnrichmentOutcome::Enriched(_) => enriched += 1,
                    EnrichmentOutcome::Failed(_) => failed += 1,
                    EnrichmentOutcome::Unchanged | EnrichmentOutcome::Skipped => unchanged += 1,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Import failed for one file");
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("done");
    println!(
        "Processed {} files: {} enriched, {} unchanged, {} failed",
        enriched + unchanged + failed,
        enriched,
        unchanged,
        failed
    );
    Ok(())
}
