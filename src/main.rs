use std::env;
use std::path::PathBuf;

use anyhow::Context;
use sentris_rag::core::{config, logging};
use sentris_rag::rag::Metadata;
use sentris_rag::RagSystem;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let files: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();

    let (config, source) = config::load_config(None).context("Failed to load configuration")?;
    logging::init(&config.logging);
    tracing::info!("Configuration loaded from {:?}", source);
    tracing::debug!("Effective configuration: {}", config.redacted());

    let rag = RagSystem::from_config(config)
        .await
        .context("Failed to initialize the RAG system")?;

    for path in &files {
        match rag.process_document(path, &Metadata::new()).await {
            Ok(ingest) => println!(
                "{}: {} chunks (doc {})",
                ingest.source_file,
                ingest.chunk_ids.len(),
                ingest.doc_id
            ),
            Err(e) => tracing::error!("Failed to ingest {}: {}", path.display(), e),
        }
    }

    let stats = rag
        .knowledge_base()
        .stats()
        .await
        .context("Failed to read knowledge base stats")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
