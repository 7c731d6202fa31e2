//! Adaptive quiz generation from retrieved educational content.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::difficulty::{level_to_category, select_closest};
use super::retriever::{ContentItem, ContentRetriever};
use crate::core::errors::RagError;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid sentence regex"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]+").expect("valid word regex"));

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "between", "both", "could", "does",
    "each", "from", "have", "into", "just", "like", "many", "more", "most", "much", "only",
    "other", "over", "same", "should", "some", "such", "than", "that", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "under", "very", "were", "what",
    "when", "where", "which", "while", "will", "with", "would", "your",
];

const FILLER_OPTIONS: [&str; 3] = [
    "An unrelated concept",
    "A common misconception",
    "None of the above",
];

const MAX_OPTIONS: usize = 4;
const KEYWORD_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub const DEFAULT: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    pub fn points(&self) -> u32 {
        match self {
            QuestionType::MultipleChoice => 10,
            QuestionType::TrueFalse => 5,
            QuestionType::ShortAnswer => 15,
        }
    }
}

impl FromStr for QuestionType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" | "mc" => Ok(QuestionType::MultipleChoice),
            "true_false" | "tf" => Ok(QuestionType::TrueFalse),
            "short_answer" | "sa" => Ok(QuestionType::ShortAnswer),
            other => Err(RagError::unsupported("question type", other)),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    pub concept_tested: String,
    pub learning_objective: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerRubric {
    pub understanding: u32,
    pub completeness: u32,
    pub clarity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
        explanation: String,
    },
    TrueFalse {
        statement: String,
        correct_answer: bool,
        explanation: String,
    },
    ShortAnswer {
        sample_answer: String,
        keywords: Vec<String>,
        rubric: ShortAnswerRubric,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub difficulty: f64,
    pub points: u32,
    pub metadata: QuestionMetadata,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAdjustment {
    pub correct_answer: f64,
    pub wrong_answer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    pub initial_difficulty: f64,
    pub difficulty_adjustment: DifficultyAdjustment,
    pub mastery_threshold: f64,
    pub minimum_questions: usize,
    pub maximum_questions: usize,
    pub time_limit_minutes: u32,
}

impl AdaptiveSettings {
    pub fn for_level(user_level: f64) -> Self {
        Self {
            initial_difficulty: user_level,
            difficulty_adjustment: DifficultyAdjustment {
                correct_answer: 0.1,
                wrong_answer: -0.15,
            },
            mastery_threshold: 0.8,
            minimum_questions: 5,
            maximum_questions: 20,
            time_limit_minutes: 30,
        }
    }

    /// Difficulty of the next question after an answer, kept within `[0, 1]`.
    pub fn adjust(&self, current: f64, correct: bool) -> f64 {
        let step = if correct {
            self.difficulty_adjustment.correct_answer
        } else {
            self.difficulty_adjustment.wrong_answer
        };
        (current + step).clamp(0.0, 1.0)
    }

    pub fn is_mastered(&self, score: f64) -> bool {
        score >= self.mastery_threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceScoring {
    pub correct: u32,
    pub partial: u32,
    pub wrong: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalseScoring {
    pub correct: u32,
    pub wrong: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerScoring {
    pub excellent: u32,
    pub good: u32,
    pub fair: u32,
    pub poor: u32,
    pub criteria: Vec<String>,
}

/// Scoring table restricted to the question types a quiz uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringRubric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_choice: Option<MultipleChoiceScoring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_false: Option<TrueFalseScoring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_answer: Option<ShortAnswerScoring>,
}

impl ScoringRubric {
    pub fn for_types(types: &[QuestionType]) -> Self {
        let mut rubric = ScoringRubric::default();
        for kind in types {
            match kind {
                QuestionType::MultipleChoice => {
                    rubric.multiple_choice = Some(MultipleChoiceScoring {
                        correct: 10,
                        partial: 0,
                        wrong: 0,
                    })
                }
                QuestionType::TrueFalse => {
                    rubric.true_false = Some(TrueFalseScoring {
                        correct: 5,
                        wrong: 0,
                    })
                }
                QuestionType::ShortAnswer => {
                    rubric.short_answer = Some(ShortAnswerScoring {
                        excellent: 15,
                        good: 10,
                        fair: 5,
                        poor: 0,
                        criteria: vec![
                            "understanding".to_string(),
                            "completeness".to_string(),
                            "clarity".to_string(),
                        ],
                    })
                }
            }
        }
        rubric
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub total_questions: usize,
    /// Distinct types in order of first appearance
    pub question_types: Vec<QuestionType>,
    pub estimated_duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub topic: String,
    pub difficulty_level: f64,
    pub questions: Vec<Question>,
    pub adaptive_settings: AdaptiveSettings,
    pub scoring_rubric: ScoringRubric,
    pub metadata: QuizMetadata,
}

/// Sentences split after runs of `.`, `!` or `?`.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn leading_sentences(text: &str, n: usize) -> String {
    sentences(text)
        .into_iter()
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most frequent content words; ties keep first appearance.
fn keywords(text: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, m) in WORD.find_iter(text).enumerate() {
        let word = m.as_str().to_lowercase();
        if word.len() < 4 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(word, _)| word).collect()
}

fn subject_of<'a>(item: &'a ContentItem, fallback: &'a str) -> &'a str {
    if item.metadata.topic.is_empty() {
        fallback
    } else {
        &item.metadata.topic
    }
}

fn concept_label<'a>(item: &'a ContentItem, fallback: &'a str) -> &'a str {
    item.metadata
        .concept
        .as_deref()
        .unwrap_or_else(|| subject_of(item, fallback))
}

pub struct AdaptiveQuizEngine {
    retriever: ContentRetriever,
}

impl AdaptiveQuizEngine {
    pub fn new(retriever: ContentRetriever) -> Self {
        Self { retriever }
    }

    /// Builds `num_questions` questions cycling through `question_types`
    /// (all three kinds when `None`), from content at the category of
    /// `user_level`.
    pub async fn generate_quiz(
        &self,
        topic: &str,
        user_level: f64,
        num_questions: usize,
        question_types: Option<&[QuestionType]>,
    ) -> Result<Quiz, RagError> {
        let types = question_types.unwrap_or(&QuestionType::DEFAULT);
        if num_questions == 0 {
            return Err(RagError::EmptyInput("num_questions must be positive".to_string()));
        }
        if types.is_empty() {
            return Err(RagError::EmptyInput("no question types requested".to_string()));
        }
        let user_level = user_level.clamp(0.0, 1.0);

        let category = level_to_category(user_level);
        let content = self.retriever.gather_topic(topic, category).await?;
        if content.is_empty() {
            return Err(RagError::EmptyContent {
                topic: topic.to_string(),
            });
        }
        tracing::debug!(
            "Generating {} questions on {:?} from {} {} items",
            num_questions,
            topic,
            content.len(),
            category
        );

        let questions = (0..num_questions)
            .map(|i| {
                let selected = select_closest(&content, user_level)?;
                Ok(build_question(
                    types[i % types.len()],
                    selected,
                    &content,
                    topic,
                    user_level,
                ))
            })
            .collect::<Result<Vec<_>, RagError>>()?;

        let mut seen_types = Vec::new();
        for question in &questions {
            let kind = question.question_type();
            if !seen_types.contains(&kind) {
                seen_types.push(kind);
            }
        }

        Ok(Quiz {
            topic: topic.to_string(),
            difficulty_level: user_level,
            adaptive_settings: AdaptiveSettings::for_level(user_level),
            scoring_rubric: ScoringRubric::for_types(types),
            metadata: QuizMetadata {
                total_questions: questions.len(),
                question_types: seen_types,
                estimated_duration: estimated_minutes(questions.len()),
            },
            questions,
        })
    }
}

/// Two minutes per question, saturating.
fn estimated_minutes(question_count: usize) -> u32 {
    u32::try_from(question_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(2)
}

fn build_question(
    kind: QuestionType,
    item: &ContentItem,
    content: &[ContentItem],
    topic: &str,
    difficulty: f64,
) -> Question {
    let subject = subject_of(item, topic);
    let metadata = QuestionMetadata {
        concept_tested: item.metadata.concept.clone().unwrap_or_default(),
        learning_objective: item.metadata.objective.clone().unwrap_or_default(),
    };

    let (text, kind) = match kind {
        QuestionType::MultipleChoice => {
            let options = multiple_choice_options(item, content, topic);
            let correct_answer = options[0].clone();
            (
                format!("Based on the content about {}, what is the key concept?", subject),
                QuestionKind::MultipleChoice {
                    explanation: format!(
                        "The material on {} centres on {}.",
                        subject, correct_answer
                    ),
                    options,
                    correct_answer,
                },
            )
        }
        QuestionType::TrueFalse => {
            let statement = leading_sentences(&item.text, 1);
            (
                format!("Is the following statement about {} correct?", subject),
                QuestionKind::TrueFalse {
                    explanation: format!(
                        "The statement is taken from the material on {}.",
                        subject
                    ),
                    statement,
                    correct_answer: true,
                },
            )
        }
        QuestionType::ShortAnswer => (
            format!("Explain the concept of {} in your own words.", subject),
            QuestionKind::ShortAnswer {
                sample_answer: leading_sentences(&item.text, 2),
                keywords: keywords(&item.text, KEYWORD_COUNT),
                rubric: ShortAnswerRubric {
                    understanding: 5,
                    completeness: 5,
                    clarity: 5,
                },
            },
        ),
    };

    Question {
        text,
        difficulty,
        points: kind_points(&kind),
        metadata,
        kind,
    }
}

fn kind_points(kind: &QuestionKind) -> u32 {
    match kind {
        QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice.points(),
        QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse.points(),
        QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer.points(),
    }
}

/// Correct label first, then distinct labels from other items, then fillers.
fn multiple_choice_options(
    item: &ContentItem,
    content: &[ContentItem],
    topic: &str,
) -> Vec<String> {
    let mut options = vec![concept_label(item, topic).to_string()];
    let is_new = |options: &[String], label: &str| {
        !label.is_empty() && !options.iter().any(|o| o.eq_ignore_ascii_case(label))
    };

    for other in content.iter().filter(|other| !std::ptr::eq(*other, item)) {
        if options.len() == MAX_OPTIONS {
            break;
        }
        let label = concept_label(other, "");
        if is_new(options.as_slice(), label) {
            options.push(label.to_string());
        }
    }
    for filler in FILLER_OPTIONS {
        if options.len() == MAX_OPTIONS {
            break;
        }
        if is_new(options.as_slice(), filler) {
            options.push(filler.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::educational::retriever::tests::{hit, ScriptedSearch};
    use crate::rag::MetadataFilter;
    use serde_json::json;
    use std::sync::Arc;

    const PHOTO: &str = "Photosynthesis converts light energy into chemical energy. \
        Plants use light to make sugar. Chlorophyll absorbs light.";

    fn engine(search: Arc<ScriptedSearch>) -> AdaptiveQuizEngine {
        AdaptiveQuizEngine::new(ContentRetriever::new(search, 5))
    }

    fn advanced_hits() -> Vec<crate::rag::QueryHit> {
        vec![
            hit(
                "1",
                PHOTO,
                0.1,
                json!({
                    "difficulty": "advanced",
                    "topic": "photosynthesis",
                    "concept": "light reactions",
                    "objective": "explain energy conversion"
                }),
            ),
            hit(
                "2",
                "The Calvin cycle fixes carbon.",
                0.2,
                json!({ "difficulty": "advanced", "concept": "Calvin cycle" }),
            ),
            hit(
                "3",
                "Stomata regulate gas exchange.",
                0.3,
                json!({ "difficulty": "advanced", "topic": "LIGHT REACTIONS" }),
            ),
        ]
    }

    #[tokio::test]
    async fn question_types_cycle_and_counts_match() {
        let search = Arc::new(ScriptedSearch::new(advanced_hits()));
        let types = [QuestionType::MultipleChoice, QuestionType::TrueFalse];
        let quiz = engine(search.clone())
            .generate_quiz("photosynthesis", 0.7, 5, Some(&types))
            .await
            .unwrap();

        let kinds: Vec<QuestionType> = quiz.questions.iter().map(|q| q.question_type()).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::TrueFalse,
                QuestionType::MultipleChoice,
                QuestionType::TrueFalse,
                QuestionType::MultipleChoice,
            ]
        );
        assert_eq!(quiz.metadata.total_questions, 5);
        assert_eq!(quiz.metadata.estimated_duration, 10);
        assert_eq!(
            quiz.metadata.question_types,
            vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]
        );
        assert!(quiz.scoring_rubric.short_answer.is_none());
        assert_eq!(quiz.scoring_rubric.true_false.as_ref().unwrap().correct, 5);

        let calls = search.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            MetadataFilter::new()
                .eq("content_type", "educational")
                .eq("difficulty", "advanced")
        );
    }

    #[tokio::test]
    async fn type_specific_fields_come_from_selected_content() {
        let quiz = engine(Arc::new(ScriptedSearch::new(advanced_hits())))
            .generate_quiz("photosynthesis", 0.7, 3, None)
            .await
            .unwrap();

        let mc = &quiz.questions[0];
        assert_eq!(
            mc.text,
            "Based on the content about photosynthesis, what is the key concept?"
        );
        assert_eq!(mc.points, 10);
        assert_eq!(mc.metadata.concept_tested, "light reactions");
        match &mc.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
                ..
            } => {
                assert_eq!(
                    options,
                    &vec![
                        "light reactions".to_string(),
                        "Calvin cycle".to_string(),
                        "An unrelated concept".to_string(),
                        "A common misconception".to_string(),
                    ]
                );
                assert_eq!(correct_answer, "light reactions");
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        match &quiz.questions[1].kind {
            QuestionKind::TrueFalse { statement, .. } => {
                assert_eq!(
                    statement,
                    "Photosynthesis converts light energy into chemical energy."
                );
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        let sa = &quiz.questions[2];
        assert_eq!(sa.points, 15);
        match &sa.kind {
            QuestionKind::ShortAnswer {
                sample_answer,
                keywords,
                ..
            } => {
                assert_eq!(
                    sample_answer,
                    "Photosynthesis converts light energy into chemical energy. \
                     Plants use light to make sugar."
                );
                assert_eq!(keywords, &vec!["light", "energy", "photosynthesis"]);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_content_and_bad_arguments_are_errors() {
        let empty = engine(Arc::new(ScriptedSearch::new(vec![])));
        let err = empty.generate_quiz("rust", 0.5, 3, None).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyContent { ref topic } if topic == "rust"));

        let err = empty.generate_quiz("rust", 0.5, 0, None).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyInput(_)));

        let err = empty.generate_quiz("rust", 0.5, 3, Some(&[])).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyInput(_)));
    }

    #[tokio::test]
    async fn out_of_range_level_is_clamped() {
        let search = Arc::new(ScriptedSearch::new(advanced_hits()));
        let quiz = engine(search.clone())
            .generate_quiz("photosynthesis", 1.7, 1, None)
            .await
            .unwrap();
        assert_eq!(quiz.difficulty_level, 1.0);
        assert_eq!(quiz.adaptive_settings.initial_difficulty, 1.0);
        assert_eq!(
            search.calls.lock().unwrap()[0].1,
            MetadataFilter::new()
                .eq("content_type", "educational")
                .eq("difficulty", "expert")
        );
    }

    #[test]
    fn adaptive_settings_adjust_within_bounds() {
        let settings = AdaptiveSettings::for_level(0.5);
        assert!((settings.adjust(0.5, true) - 0.6).abs() < 1e-9);
        assert!((settings.adjust(0.5, false) - 0.35).abs() < 1e-9);
        assert_eq!(settings.adjust(0.95, true), 1.0);
        assert_eq!(settings.adjust(0.1, false), 0.0);
        assert!(settings.is_mastered(0.8));
        assert!(!settings.is_mastered(0.79));
    }

    #[test]
    fn question_serialises_with_flat_type_tag() {
        let question = Question {
            text: "Is it true?".to_string(),
            difficulty: 0.4,
            points: 5,
            metadata: QuestionMetadata {
                concept_tested: String::new(),
                learning_objective: String::new(),
            },
            kind: QuestionKind::TrueFalse {
                statement: "Water boils at 100 C.".to_string(),
                correct_answer: true,
                explanation: String::new(),
            },
        };
        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["type"], "true_false");
        assert_eq!(value["statement"], "Water boils at 100 C.");
        assert_eq!(value["points"], 5);
    }

    #[test]
    fn estimated_duration_saturates() {
        assert_eq!(estimated_minutes(7), 14);
        assert_eq!(estimated_minutes(u32::MAX as usize), u32::MAX);
        assert_eq!(estimated_minutes(usize::MAX), u32::MAX);
    }

    #[test]
    fn question_type_labels() {
        assert_eq!("Short_Answer".parse::<QuestionType>().unwrap(), QuestionType::ShortAnswer);
        assert!(matches!(
            "essay".parse::<QuestionType>(),
            Err(RagError::UnsupportedFormat { .. })
        ));
    }
}
