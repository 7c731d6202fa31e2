//! Top-level façade wiring the provider, knowledge base, document processor
//! and web search together.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::config::SentrisConfig;
use crate::core::errors::RagError;
use crate::educational::{
    AdaptiveQuizEngine, ContentQualityChecker, ContentRetriever, LearningPathGenerator,
    Materials, MaterialsGenerator,
};
use crate::llm::{build_provider, LlmProvider, ProviderEmbedder};
use crate::rag::{
    DocumentProcessor, InMemoryVectorStore, KnowledgeBase, Metadata, MetadataFilter,
    ProcessedDocument, QueryHit, SqliteVectorStore, VectorStore,
};
use crate::web::WebSearch;

/// Result of ingesting one document or page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentIngest {
    pub doc_id: String,
    /// `{doc_id}_{chunk_index}` for every stored chunk
    pub chunk_ids: Vec<String>,
    pub source_file: String,
}

pub struct RagSystem {
    config: SentrisConfig,
    llm: Arc<dyn LlmProvider>,
    knowledge_base: Arc<KnowledgeBase>,
    processor: DocumentProcessor,
    web: WebSearch,
}

async fn open_store(config: &SentrisConfig) -> Result<Arc<dyn VectorStore>, RagError> {
    match config.vector_store.engine.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        "sqlite" => Ok(Arc::new(SqliteVectorStore::open(&config.vector_store).await?)),
        other => Err(RagError::unsupported("vector store", other)),
    }
}

impl RagSystem {
    /// Builds every collaborator from configuration.
    ///
    /// Fails with a configuration error when the LLM provider has no API key,
    /// since embeddings are served by the same provider.
    pub async fn from_config(config: SentrisConfig) -> Result<Self, RagError> {
        let llm = build_provider(&config.llm, config.embeddings.model.clone())?;
        let embedder = Arc::new(ProviderEmbedder::new(llm.clone()));
        let store = open_store(&config).await?;
        let knowledge_base = Arc::new(KnowledgeBase::new(embedder, store, &config.embeddings));
        let processor = DocumentProcessor::from_config(&config.document_processor)?;
        let web = WebSearch::from_config(&config.web_search)?;

        tracing::info!(
            "RAG system ready: provider={}, store={}",
            llm.name(),
            knowledge_base.store().name()
        );

        Ok(Self::with_components(config, llm, knowledge_base, processor, web))
    }

    pub fn with_components(
        config: SentrisConfig,
        llm: Arc<dyn LlmProvider>,
        knowledge_base: Arc<KnowledgeBase>,
        processor: DocumentProcessor,
        web: WebSearch,
    ) -> Self {
        Self {
            config,
            llm,
            knowledge_base,
            processor,
            web,
        }
    }

    pub fn config(&self) -> &SentrisConfig {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge_base
    }

    pub fn web_search(&self) -> &WebSearch {
        &self.web
    }

    async fn store_processed(
        &self,
        processed: ProcessedDocument,
    ) -> Result<DocumentIngest, RagError> {
        let chunk_ids = processed.chunk_ids();
        let texts = processed.texts();
        self.knowledge_base
            .add_documents(texts, processed.metadata, Some(chunk_ids.clone()))
            .await?;
        tracing::info!(
            "Stored {} chunks of {} as {}",
            chunk_ids.len(),
            processed.source_file,
            processed.doc_id
        );
        Ok(DocumentIngest {
            doc_id: processed.doc_id,
            chunk_ids,
            source_file: processed.source_file,
        })
    }

    pub async fn process_document(
        &self,
        path: &Path,
        extra: &Metadata,
    ) -> Result<DocumentIngest, RagError> {
        let processed = self.processor.process_file(path, extra).await?;
        self.store_processed(processed).await
    }

    pub async fn process_text(
        &self,
        text: &str,
        source: &str,
        extra: &Metadata,
    ) -> Result<DocumentIngest, RagError> {
        let processed = self.processor.process_text(text, source, extra)?;
        self.store_processed(processed).await
    }

    /// Semantic search; `limit` defaults to `retrieval.results_per_query`.
    pub async fn search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<QueryHit>, RagError> {
        let limit = limit.unwrap_or(self.config.retrieval.results_per_query);
        self.knowledge_base.search(query, filter, limit).await
    }

    /// Searches the web, fetches each result and ingests every page that
    /// yielded readable text.
    pub async fn web_search_and_process(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<DocumentIngest>, RagError> {
        let response = self
            .web
            .search_and_enrich(query, None, max_results, None)
            .await?;

        let mut ingested = Vec::new();
        for hit in response.results {
            let Some(content) = hit.content else {
                tracing::debug!("Skipping {} without content", hit.url);
                continue;
            };
            let mut extra = Metadata::new();
            extra.insert("source".to_string(), Value::String(hit.url.clone()));
            extra.insert("title".to_string(), Value::String(hit.title));
            extra.insert("snippet".to_string(), Value::String(hit.snippet));
            extra.insert("search_query".to_string(), Value::String(query.to_string()));

            match self.process_text(&content, &hit.url, &extra).await {
                Ok(ingest) => ingested.push(ingest),
                Err(RagError::EmptyInput(reason)) => {
                    tracing::debug!("Skipping {}: {}", hit.url, reason);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Ingested {} pages for {:?}", ingested.len(), query);
        Ok(ingested)
    }

    fn retriever(&self) -> ContentRetriever {
        ContentRetriever::new(
            self.knowledge_base.clone(),
            self.config.retrieval.results_per_query,
        )
    }

    pub fn learning_path_generator(&self) -> LearningPathGenerator {
        LearningPathGenerator::new(self.retriever())
    }

    pub fn quiz_engine(&self) -> AdaptiveQuizEngine {
        AdaptiveQuizEngine::new(self.retriever())
    }

    pub fn materials_generator(&self) -> MaterialsGenerator {
        MaterialsGenerator::new(
            self.llm.clone(),
            self.knowledge_base.clone(),
            &self.config.llm,
        )
    }

    pub fn quality_checker(&self) -> ContentQualityChecker {
        ContentQualityChecker::new(&self.config.quality)
    }

    pub async fn generate_materials(&self, doc_id: &str) -> Result<Materials, RagError> {
        self.materials_generator().generate_materials(doc_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EmbeddingsConfig;
    use crate::educational::materials::tests::ScriptedLlm;
    use crate::rag::knowledge_base::tests::KeywordEmbedder;
    use crate::rag::{FileExtractor, LexicalTokenizer, TextChunker};
    use crate::web::search::tests::{fast_config, sample_hits, FakeTransport};
    use serde_json::json;

    fn system(pages: Vec<(&str, &str)>) -> RagSystem {
        let knowledge_base = Arc::new(KnowledgeBase::new(
            Arc::new(KeywordEmbedder::new()),
            Arc::new(InMemoryVectorStore::new()),
            &EmbeddingsConfig::default(),
        ));
        let chunker = TextChunker::new(Arc::new(LexicalTokenizer), 16, 4, 100).unwrap();
        let processor = DocumentProcessor::new(
            Arc::new(FileExtractor),
            chunker,
            vec!["txt".to_string(), ".HTML".to_string()],
        );
        let web = WebSearch::with_transport(
            Arc::new(FakeTransport::new(sample_hits(), pages)),
            &fast_config(),
        )
        .unwrap();
        RagSystem::with_components(
            SentrisConfig::default(),
            Arc::new(ScriptedLlm::new()),
            knowledge_base,
            processor,
            web,
        )
    }

    #[tokio::test]
    async fn process_document_stores_chunks_under_uuid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.txt");
        std::fs::write(
            &path,
            "Every cell has a membrane. The cell nucleus holds DNA. Energy comes from \
             mitochondria inside the cell. Plant cells also have chloroplasts for energy.",
        )
        .unwrap();

        let rag = system(vec![]);
        let extra = json!({ "subject": "biology", "content_type": "educational" })
            .as_object()
            .cloned()
            .unwrap();
        let ingest = rag.process_document(&path, &extra).await.unwrap();

        assert!(uuid::Uuid::parse_str(&ingest.doc_id).is_ok());
        assert!(ingest.chunk_ids.len() >= 2);
        assert_eq!(ingest.chunk_ids[0], format!("{}_0", ingest.doc_id));

        let stored = rag
            .knowledge_base()
            .get_document(&ingest.chunk_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.metadata["subject"], "biology");
        assert_eq!(stored.metadata["doc_id"], ingest.doc_id.as_str());
        assert_eq!(stored.metadata["chunk_index"], 0);

        let hits = rag.search("cell", None, Some(1)).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn unsupported_files_are_rejected_before_extraction() {
        let rag = system(vec![]);
        let err = rag
            .process_document(Path::new("/nonexistent/slides.pptx"), &Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn web_results_without_content_are_skipped() {
        let rag = system(vec![(
            "https://bio.example.org/photo",
            "Chlorophyll absorbs light energy. Plants store energy as sugar.",
        )]);

        let ingested = rag
            .web_search_and_process("photosynthesis", Some(5))
            .await
            .unwrap();
        assert_eq!(ingested.len(), 1);
        assert_eq!(ingested[0].source_file, "https://bio.example.org/photo");

        let stored = rag
            .knowledge_base()
            .get_document(&ingested[0].chunk_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.metadata["file_type"], "web");
        assert_eq!(stored.metadata["search_query"], "photosynthesis");
        assert_eq!(stored.metadata["title"], "Photosynthesis basics");
    }

    #[tokio::test]
    async fn unknown_vector_store_engine_is_unsupported() {
        let mut config = SentrisConfig::default();
        config.vector_store.engine = "lancedb".to_string();
        let err = open_store(&config).await.err().unwrap();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn from_config_requires_an_api_key() {
        let mut config = SentrisConfig::default();
        config.llm.api_key = None;
        config.vector_store.engine = "memory".to_string();
        let err = RagSystem::from_config(config).await.err().unwrap();
        assert!(matches!(err, RagError::Configuration { .. }));
    }
}
