use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use medibot_backend::core::logging;
use medibot_backend::core::config::{AppPaths, ConfigService};
use medibot_backend::core::text::preview;
use medibot_backend::ingest::{self, markdown, Chunker, Indexer, LlamaParseClient, ParsedPage};
use medibot_backend::llm::OpenAiProvider;
use medibot_backend::rag::PineconeStore;

const DEFAULT_PDF: &str = "Data/The_GALE_ENCYCLOPEDIA_of_MEDICINE_SECOND.pdf";

/// Parse PDFs with LlamaParse, save them as Markdown and optionally index them.
#[derive(Parser, Debug)]
#[command(name = "parse-pdf", version, about)]
struct Args {
    /// PDF files to parse
    #[arg(default_value = DEFAULT_PDF)]
    files: Vec<PathBuf>,

    /// Pages per parse job; 0 sends each file as a single job
    #[arg(long, default_value_t = 700)]
    partition_pages: u32,

    /// Markdown file receiving every parsed page
    #[arg(long, short, default_value = "gale_encyclopedia_parsed.md")]
    output: PathBuf,

    /// Chunk, embed and upsert the parsed pages into the vector index
    #[arg(long)]
    index: bool,

    /// Characters of each page echoed to stdout
    #[arg(long, default_value_t = 500)]
    preview_chars: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths.log_dir, "ingest.log");

    let config = ConfigService::new(paths)
        .load_app_config()
        .context("Failed to load configuration")?;

    for file in &args.files {
        ingest::ensure_exists(file)?;
    }

    let parser = LlamaParseClient::new(&config.parser)?;
    let partition_pages = Some(args.partition_pages).filter(|n| *n > 0);
    let documents = ingest::parse_all(
        &parser,
        &args.files,
        partition_pages,
        config.parser.num_workers,
    )
    .await?;

    let pages: Vec<ParsedPage> = documents
        .iter()
        .flat_map(|doc| doc.pages.iter())
        .enumerate()
        .map(|(i, page)| ParsedPage {
            page: i as u32 + 1,
            text: page.text.clone(),
        })
        .collect();
    println!("Finished parsing. Got {} pages.", pages.len());

    for page in &pages {
        println!("--- Page {} ---", page.page);
        println!("{}", preview(&page.text, args.preview_chars));
        println!("\n{}\n", "=".repeat(50));
    }

    markdown::write_pages(&args.output, &pages).await?;
    println!("Parsed content saved to {}", args.output.display());

    if args.index {
        let chunker = Chunker::new(&config.ingest);
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| chunker.split_pages(&doc.pages, &doc.source()))
            .collect();
        tracing::info!(chunks = chunks.len(), "Chunked parsed pages");

        let store = Arc::new(PineconeStore::connect(&config.pinecone).await?);
        let embeddings = Arc::new(OpenAiProvider::new(
            config.embedding.base_url.clone(),
            config.embedding.api_key.clone(),
        ));
        let indexer = Indexer::new(
            embeddings,
            config.embedding.model.clone(),
            store,
            config.embedding.batch_size,
        );

        let written = indexer.index(&chunks).await?;
        println!(
            "Indexed {} chunks into '{}'",
            written, config.pinecone.index_name
        );
    }

    Ok(())
}
