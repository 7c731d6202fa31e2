//! Educational layer over the knowledge base: difficulty mapping, retrieval,
//! learning paths, adaptive quizzes, study materials and quality checks.

pub mod difficulty;
pub mod learning_path;
pub mod materials;
pub mod packer;
pub mod quality;
pub mod quiz;
pub mod retriever;

pub use difficulty::{
    category_to_anchor, level_to_category, rank_by_difficulty, select_closest, DifficultyLevel,
};
pub use learning_path::{
    Assessment, AssessmentQuestion, Checkpoint, LearningPathGenerator, ProgressTracking,
    UserProfile,
};
pub use materials::{Flashcard, Materials, MaterialsGenerator, ReviewQuestion};
pub use packer::{
    Activity, ActivityType, InteractiveElement, LearningPath, LearningStyle, Module, ModulePacker,
};
pub use quality::{CheckResult, ContentQualityChecker, QualityChecks, QualityReport};
pub use quiz::{
    AdaptiveQuizEngine, AdaptiveSettings, Question, QuestionKind, QuestionType, Quiz,
    ScoringRubric,
};
pub use retriever::{ContentItem, ContentMetadata, ContentRetriever};
