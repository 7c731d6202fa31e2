//! Personalised learning paths: retrieval, packing, assessments and checkpoints.

use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyLevel;
use super::packer::{Activity, LearningPath, LearningStyle, Module, ModulePacker};
use super::retriever::ContentRetriever;
use crate::core::errors::RagError;

const ASSESSMENT_POINTS: u32 = 10;
const MINIMUM_SCORE: f64 = 0.7;
const RETRY_ATTEMPTS: u32 = 2;
const CHECKPOINT_EVERY: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub level: DifficultyLevel,
    pub learning_style: LearningStyle,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenEndedRubric {
    pub criteria: Vec<String>,
    pub points_per_criterion: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssessmentQuestion {
    MultipleChoice {
        text: String,
        difficulty: DifficultyLevel,
        points: u32,
        options: Vec<String>,
        correct_answer: String,
    },
    OpenEnded {
        text: String,
        difficulty: DifficultyLevel,
        points: u32,
        rubric: OpenEndedRubric,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "type")]
    pub kind: AssessmentKind,
    pub questions: Vec<AssessmentQuestion>,
}

impl Assessment {
    /// Multiple-choice quiz taken before a module, one question per activity.
    pub fn pre(difficulty: DifficultyLevel, activities: &[Activity]) -> Self {
        let questions = activities
            .iter()
            .map(|activity| AssessmentQuestion::MultipleChoice {
                text: format!("Question about {}", activity.learning_goal),
                difficulty,
                points: ASSESSMENT_POINTS,
                options: ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(),
                correct_answer: "A".to_string(),
            })
            .collect();
        Self {
            kind: AssessmentKind::Quiz,
            questions,
        }
    }

    /// Open-ended quiz taken after a module, one question per activity.
    pub fn post(difficulty: DifficultyLevel, activities: &[Activity]) -> Self {
        let questions = activities
            .iter()
            .map(|activity| AssessmentQuestion::OpenEnded {
                text: format!("Question about {}", activity.learning_goal),
                difficulty,
                points: ASSESSMENT_POINTS,
                rubric: OpenEndedRubric {
                    criteria: ["accuracy", "completeness", "reasoning"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    points_per_criterion: 3,
                },
            })
            .collect();
        Self {
            kind: AssessmentKind::Quiz,
            questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRequirements {
    pub minimum_time_spent: f64,
    pub completion_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub activity_index: usize,
    pub requirements: CheckpointRequirements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressTracking {
    pub checkpoints: Vec<Checkpoint>,
    pub minimum_score: f64,
    pub retry_attempts: u32,
}

impl ProgressTracking {
    pub fn for_module(module: &Module) -> Self {
        let checkpoints = module
            .activities
            .iter()
            .enumerate()
            .step_by(CHECKPOINT_EVERY)
            .map(|(i, activity)| Checkpoint {
                name: format!("Checkpoint {}", i / CHECKPOINT_EVERY + 1),
                activity_index: i,
                requirements: CheckpointRequirements {
                    minimum_time_spent: activity.duration_minutes * 0.8,
                    completion_criteria: vec![
                        "watched_video".to_string(),
                        "submitted_exercise".to_string(),
                    ],
                },
            })
            .collect();
        Self {
            checkpoints,
            minimum_score: MINIMUM_SCORE,
            retry_attempts: RETRY_ATTEMPTS,
        }
    }
}

pub struct LearningPathGenerator {
    retriever: ContentRetriever,
}

impl LearningPathGenerator {
    pub fn new(retriever: ContentRetriever) -> Self {
        Self { retriever }
    }

    pub async fn generate_path(
        &self,
        profile: &UserProfile,
        course_material: &str,
        learning_goals: &[String],
        max_duration_hours: Option<f64>,
    ) -> Result<LearningPath, RagError> {
        if learning_goals.is_empty() {
            return Err(RagError::EmptyInput("no learning goals given".to_string()));
        }

        let content = self.retriever.gather(learning_goals, course_material).await?;
        tracing::info!(
            "Gathered {} content items for {} goals in {}",
            content.len(),
            learning_goals.len(),
            course_material
        );

        let packer = ModulePacker::new(course_material, learning_goals.to_vec());
        let mut path = packer.pack(
            &content,
            profile.level,
            profile.learning_style,
            max_duration_hours.map(|hours| hours * 60.0),
        );

        for module in path.modules.iter_mut() {
            module.pre_assessment = Some(Assessment::pre(module.difficulty, &module.activities));
            module.post_assessment =
                Some(Assessment::post(module.difficulty, &module.activities));
            module.progress_tracking = Some(ProgressTracking::for_module(module));
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::educational::retriever::tests::{hit, ScriptedSearch};
    use serde_json::json;
    use std::sync::Arc;

    fn generator(search: Arc<ScriptedSearch>) -> LearningPathGenerator {
        LearningPathGenerator::new(ContentRetriever::new(search, 5))
    }

    fn profile(level: DifficultyLevel, style: LearningStyle) -> UserProfile {
        UserProfile {
            level,
            learning_style: style,
            interests: vec![],
        }
    }

    #[tokio::test]
    async fn modules_carry_assessments_and_checkpoints() {
        let hits = (0..4)
            .map(|i| {
                hit(
                    &i.to_string(),
                    &format!("Beginner text {}", i),
                    0.1,
                    json!({ "difficulty": "beginner" }),
                )
            })
            .collect();
        let search = Arc::new(ScriptedSearch::new(hits));
        let path = generator(search.clone())
            .generate_path(
                &profile(DifficultyLevel::Beginner, LearningStyle::Reading),
                "Biology",
                &["cells".to_string()],
                None,
            )
            .await
            .unwrap();

        assert_eq!(path.modules.len(), 1);
        let module = &path.modules[0];
        assert_eq!(module.activities.len(), 4);

        let pre = module.pre_assessment.as_ref().unwrap();
        assert_eq!(pre.questions.len(), 4);
        match &pre.questions[0] {
            AssessmentQuestion::MultipleChoice {
                text,
                correct_answer,
                points,
                ..
            } => {
                assert_eq!(text, "Question about cells");
                assert_eq!(correct_answer, "A");
                assert_eq!(*points, 10);
            }
            other => panic!("unexpected question: {:?}", other),
        }
        assert!(matches!(
            module.post_assessment.as_ref().unwrap().questions[0],
            AssessmentQuestion::OpenEnded { .. }
        ));

        let tracking = module.progress_tracking.as_ref().unwrap();
        let names: Vec<&str> = tracking.checkpoints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Checkpoint 1", "Checkpoint 2"]);
        assert_eq!(tracking.checkpoints[1].activity_index, 3);
        assert_eq!(tracking.checkpoints[0].requirements.minimum_time_spent, 24.0);
        assert_eq!(tracking.retry_attempts, 2);

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls[0].0, "content for cells in Biology");
    }

    #[tokio::test]
    async fn duration_budget_is_given_in_hours() {
        let hits = (0..5)
            .map(|i| hit(&i.to_string(), "text", 0.1, json!({ "difficulty": "advanced" })))
            .collect();
        let path = generator(Arc::new(ScriptedSearch::new(hits)))
            .generate_path(
                &profile(DifficultyLevel::Intermediate, LearningStyle::Reading),
                "Physics",
                &["optics".to_string()],
                Some(1.0),
            )
            .await
            .unwrap();

        assert_eq!(path.total_duration, 60.0);
        assert_eq!(path.modules[0].title, "Advanced Physics");
        assert_eq!(path.learning_goals, vec!["optics"]);
    }

    #[tokio::test]
    async fn empty_goals_are_rejected() {
        let err = generator(Arc::new(ScriptedSearch::new(vec![])))
            .generate_path(
                &profile(DifficultyLevel::Beginner, LearningStyle::Visual),
                "Biology",
                &[],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyInput(_)));
    }

    #[test]
    fn profile_deserialises_with_default_interests() {
        let profile: UserProfile =
            serde_json::from_value(json!({ "level": "advanced", "learning_style": "auditory" }))
                .unwrap();
        assert_eq!(profile.level, DifficultyLevel::Advanced);
        assert!(profile.interests.is_empty());
    }
}
