use super::SentrisConfig;
use crate::core::errors::RagError;

pub fn validate_config(config: &SentrisConfig) -> Result<(), RagError> {
    let llm = &config.llm;
    validate_f64_range("llm.temperature", llm.temperature, 0.0, 2.0)?;
    validate_u64_range("llm.max_tokens", llm.max_tokens as u64, 1, 1_000_000)?;
    validate_u64_range(
        "llm.request_timeout_secs",
        llm.request_timeout_secs,
        1,
        86_400,
    )?;
    validate_non_empty("llm.provider", &llm.provider)?;

    validate_u64_range(
        "embeddings.batch_size",
        config.embeddings.batch_size as u64,
        1,
        10_000,
    )?;

    let store = &config.vector_store;
    validate_non_empty("vector_store.engine", &store.engine)?;
    validate_non_empty("vector_store.collection_name", &store.collection_name)?;
    if store.distance_metric != "cosine" {
        return Err(RagError::config(
            "vector_store.distance_metric",
            format!("only 'cosine' is supported, got '{}'", store.distance_metric),
        ));
    }

    let processor = &config.document_processor;
    validate_u64_range(
        "document_processor.chunk_size",
        processor.chunk_size as u64,
        1,
        1_000_000,
    )?;
    validate_u64_range(
        "document_processor.max_chunks_per_doc",
        processor.max_chunks_per_doc as u64,
        1,
        10_000_000,
    )?;
    if processor.chunk_overlap >= processor.chunk_size {
        return Err(RagError::config(
            "document_processor.chunk_overlap",
            format!(
                "must be smaller than chunk_size ({} >= {})",
                processor.chunk_overlap, processor.chunk_size
            ),
        ));
    }
    if processor.supported_formats.is_empty() {
        return Err(RagError::config(
            "document_processor.supported_formats",
            "at least one format is required",
        ));
    }
    for (index, format) in processor.supported_formats.iter().enumerate() {
        validate_non_empty(
            &format!("document_processor.supported_formats[{}]", index),
            format,
        )?;
    }

    let web = &config.web_search;
    validate_non_empty("web_search.default_engine", &web.default_engine)?;
    validate_u64_range("web_search.max_results", web.max_results as u64, 1, 100)?;
    validate_f64_range("web_search.rate_limit_secs", web.rate_limit_secs, 0.0, 3600.0)?;
    validate_u64_range(
        "web_search.fetch_timeout_secs",
        web.fetch_timeout_secs,
        1,
        86_400,
    )?;

    validate_u64_range(
        "retrieval.results_per_query",
        config.retrieval.results_per_query as u64,
        1,
        1000,
    )?;

    validate_f64_range(
        "quality.min_quality_score",
        config.quality.min_quality_score,
        0.0,
        1.0,
    )?;

    Ok(())
}

fn validate_u64_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), RagError> {
    if value < min || value > max {
        return Err(RagError::config(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_f64_range(path: &str, value: f64, min: f64, max: f64) -> Result<(), RagError> {
    if !value.is_finite() || value < min || value > max {
        return Err(RagError::config(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), RagError> {
    if value.trim().is_empty() {
        return Err(RagError::config(path, "value cannot be empty"));
    }
    Ok(())
}
