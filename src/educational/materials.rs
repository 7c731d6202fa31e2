//! LLM-generated study materials: summaries, flashcards and review questions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::LlmConfig;
use crate::core::errors::RagError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::rag::{KnowledgeBase, MetadataFilter};

const DEFAULT_FLASHCARDS: usize = 10;
const DEFAULT_REVIEW_QUESTIONS: usize = 5;

const SUMMARY_PROMPT: &str = "Summarize the following study material in a few short \
paragraphs. Keep every key concept and definition.\n\n";

const FLASHCARD_PROMPT: &str = "Create {count} flashcards from the study material below. \
Write each card as two lines, one starting with \"Front:\" and one starting with \"Back:\".\n\n";

const REVIEW_PROMPT: &str = "Write {count} review questions about the study material below. \
Write each as two lines, one starting with \"Question:\" and one starting with \"Answer:\".\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewQuestion {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Materials {
    pub doc_id: String,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub review_questions: Vec<ReviewQuestion>,
}

/// Parses `open`/`close` labelled line pairs.
///
/// An `open` line starts an entry and a later `close` line completes it.
/// Unlabelled lines continue whichever side is being read. An entry that is
/// never closed is dropped.
fn parse_labelled_pairs(output: &str, open: &str, close: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut pending: Option<String> = None;
    let mut current: Option<(String, String)> = None;

    for line in output.lines() {
        let line = line.trim();
        let unmarked = line.trim_start_matches(|c: char| {
            c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | ' ')
        });
        if let Some(rest) = unmarked.strip_prefix(open) {
            if let Some(done) = current.take() {
                pairs.push(done);
            }
            pending = Some(rest.trim().to_string());
        } else if let Some(rest) = unmarked.strip_prefix(close) {
            match pending.take() {
                Some(front) => {
                    if let Some(done) = current.take() {
                        pairs.push(done);
                    }
                    current = Some((front, rest.trim().to_string()));
                }
                None => {
                    tracing::debug!("Ignoring {:?} line without a preceding {:?}", close, open);
                }
            }
        } else if !line.is_empty() {
            if let Some(front) = pending.as_mut() {
                front.push(' ');
                front.push_str(line);
            } else if let Some((_, back)) = current.as_mut() {
                back.push(' ');
                back.push_str(line);
            }
        }
    }
    if let Some(done) = current {
        pairs.push(done);
    }

    pairs
        .into_iter()
        .filter(|(front, back)| !front.is_empty() && !back.is_empty())
        .collect()
}

pub fn parse_flashcards(output: &str) -> Vec<Flashcard> {
    parse_labelled_pairs(output, "Front:", "Back:")
        .into_iter()
        .map(|(front, back)| Flashcard { front, back })
        .collect()
}

pub fn parse_review_questions(output: &str) -> Vec<ReviewQuestion> {
    parse_labelled_pairs(output, "Question:", "Answer:")
        .into_iter()
        .map(|(question, answer)| ReviewQuestion { question, answer })
        .collect()
}

pub struct MaterialsGenerator {
    llm: Arc<dyn LlmProvider>,
    knowledge_base: Arc<KnowledgeBase>,
    config: LlmConfig,
}

impl MaterialsGenerator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        knowledge_base: Arc<KnowledgeBase>,
        config: &LlmConfig,
    ) -> Self {
        Self {
            llm,
            knowledge_base,
            config: config.clone(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, RagError> {
        let request = CompletionRequest::new(prompt).with_config(&self.config);
        self.llm.complete(request).await
    }

    fn require_text(text: &str) -> Result<(), RagError> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyInput("no study material given".to_string()));
        }
        Ok(())
    }

    pub async fn summarize(&self, text: &str) -> Result<String, RagError> {
        Self::require_text(text)?;
        let summary = self.complete(format!("{}{}", SUMMARY_PROMPT, text)).await?;
        Ok(summary.trim().to_string())
    }

    pub async fn flashcards(&self, text: &str, count: usize) -> Result<Vec<Flashcard>, RagError> {
        Self::require_text(text)?;
        let prompt = FLASHCARD_PROMPT.replace("{count}", &count.to_string());
        let output = self.complete(format!("{}{}", prompt, text)).await?;
        let mut cards = parse_flashcards(&output);
        cards.truncate(count);
        Ok(cards)
    }

    pub async fn review_questions(
        &self,
        text: &str,
        count: usize,
    ) -> Result<Vec<ReviewQuestion>, RagError> {
        Self::require_text(text)?;
        let prompt = REVIEW_PROMPT.replace("{count}", &count.to_string());
        let output = self.complete(format!("{}{}", prompt, text)).await?;
        let mut questions = parse_review_questions(&output);
        questions.truncate(count);
        Ok(questions)
    }

    /// Materials for every stored chunk of `doc_id`, read in chunk order.
    pub async fn generate_materials(&self, doc_id: &str) -> Result<Materials, RagError> {
        let filter = MetadataFilter::new().eq("doc_id", doc_id);
        let mut chunks = self
            .knowledge_base
            .document_chunks(Some(&filter), None)
            .await?;
        if chunks.is_empty() {
            return Err(RagError::EmptyContent {
                topic: doc_id.to_string(),
            });
        }
        chunks.sort_by_key(|chunk| {
            chunk
                .metadata
                .get("chunk_index")
                .and_then(|v| v.as_u64())
                .unwrap_or(u64::MAX)
        });
        let text = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        tracing::info!(
            "Generating materials for {} from {} chunks",
            doc_id,
            chunks.len()
        );

        Ok(Materials {
            doc_id: doc_id.to_string(),
            summary: self.summarize(&text).await?,
            flashcards: self.flashcards(&text, DEFAULT_FLASHCARDS).await?,
            review_questions: self
                .review_questions(&text, DEFAULT_REVIEW_QUESTIONS)
                .await?,
        })
    }
}
