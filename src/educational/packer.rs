//! Packs retrieved content into difficulty-ordered learning modules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyLevel;
use super::learning_path::{Assessment, ProgressTracking};
use super::retriever::ContentItem;
use crate::core::errors::RagError;

const BASE_ACTIVITY_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Reading,
    Kinesthetic,
}

impl LearningStyle {
    /// Unrecognised labels fall back to kinesthetic.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "visual" => LearningStyle::Visual,
            "auditory" => LearningStyle::Auditory,
            "reading" => LearningStyle::Reading,
            _ => LearningStyle::Kinesthetic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Reading => "reading",
            LearningStyle::Kinesthetic => "kinesthetic",
        }
    }

    pub fn duration_multiplier(&self) -> f64 {
        match self {
            LearningStyle::Visual => 1.2,
            LearningStyle::Auditory => 1.1,
            LearningStyle::Reading => 1.0,
            LearningStyle::Kinesthetic => 1.3,
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        match self {
            LearningStyle::Visual => ActivityType::VideoLesson,
            LearningStyle::Auditory => ActivityType::AudioLecture,
            LearningStyle::Reading => ActivityType::TextMaterial,
            LearningStyle::Kinesthetic => ActivityType::InteractiveExercise,
        }
    }
}

impl FromStr for LearningStyle {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LearningStyle::from_label(s))
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    VideoLesson,
    AudioLecture,
    TextMaterial,
    InteractiveExercise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractiveElement {
    PracticeProblem {
        question: String,
        hints: Vec<String>,
        solution_steps: Vec<String>,
    },
    Simulation {
        scenario: String,
        parameters: Vec<String>,
        expected_outcomes: Vec<String>,
    },
    KnowledgeCheck {
        questions: Vec<CheckQuestion>,
    },
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl InteractiveElement {
    /// Elements depend only on the activity type and the goal it serves.
    pub fn for_activity(kind: ActivityType, learning_goal: &str) -> Vec<Self> {
        match kind {
            ActivityType::InteractiveExercise => vec![
                InteractiveElement::PracticeProblem {
                    question: format!("Apply the concept of {}", learning_goal),
                    hints: strings(&["Consider the key points", "Look for patterns"]),
                    solution_steps: strings(&["Step 1", "Step 2", "Step 3"]),
                },
                InteractiveElement::Simulation {
                    scenario: format!("Real-world application of {}", learning_goal),
                    parameters: strings(&["param1", "param2"]),
                    expected_outcomes: strings(&["outcome1", "outcome2"]),
                },
            ],
            ActivityType::VideoLesson => vec![InteractiveElement::KnowledgeCheck {
                questions: vec![CheckQuestion {
                    question: format!("What is the main concept in {}?", learning_goal),
                    options: strings(&["A", "B", "C", "D"]),
                    correct: "A".to_string(),
                }],
            }],
            ActivityType::AudioLecture | ActivityType::TextMaterial => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub content: String,
    pub duration_minutes: f64,
    pub learning_goal: String,
    pub prerequisites: Vec<String>,
    pub resources: Vec<String>,
    pub interactive_elements: Vec<InteractiveElement>,
}

impl Activity {
    pub fn from_content(item: &ContentItem, style: LearningStyle) -> Self {
        let kind = style.activity_type();
        Self {
            kind,
            content: item.text.clone(),
            duration_minutes: BASE_ACTIVITY_MINUTES * style.duration_multiplier(),
            learning_goal: item.metadata.learning_goal.clone(),
            prerequisites: item.metadata.prerequisites.clone(),
            resources: item.metadata.resources.clone(),
            interactive_elements: InteractiveElement::for_activity(
                kind,
                &item.metadata.learning_goal,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    pub difficulty: DifficultyLevel,
    pub learning_style: LearningStyle,
    pub activities: Vec<Activity>,
    pub estimated_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_assessment: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_assessment: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_tracking: Option<ProgressTracking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub modules: Vec<Module>,
    pub total_duration: f64,
    pub difficulty_progression: Vec<DifficultyLevel>,
    pub learning_goals: Vec<String>,
    pub user_level: DifficultyLevel,
}

pub struct ModulePacker {
    subject: String,
    learning_goals: Vec<String>,
}

impl ModulePacker {
    pub fn new(subject: impl Into<String>, learning_goals: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            learning_goals,
        }
    }

    /// Builds at most one module per difficulty level, starting at
    /// `start_level`. `max_duration_minutes = None` means no budget.
    ///
    /// The budget applies to the whole path: the first activity that would
    /// exceed it is dropped and packing ends there.
    pub fn pack(
        &self,
        content: &[ContentItem],
        start_level: DifficultyLevel,
        style: LearningStyle,
        max_duration_minutes: Option<f64>,
    ) -> LearningPath {
        let budget = max_duration_minutes.unwrap_or(f64::INFINITY);

        let mut buckets: [Vec<&ContentItem>; 4] = Default::default();
        for item in content {
            buckets[item.metadata.difficulty.index()].push(item);
        }

        let mut modules = Vec::new();
        let mut total = 0.0;
        let mut exhausted = false;

        for level in DifficultyLevel::ALL.into_iter().skip(start_level.index()) {
            let bucket = &buckets[level.index()];
            if bucket.is_empty() {
                continue;
            }

            let mut module = Module {
                title: format!("{} {}", level.title(), self.subject),
                difficulty: level,
                learning_style: style,
                activities: Vec::new(),
                estimated_duration: 0.0,
                pre_assessment: None,
                post_assessment: None,
                progress_tracking: None,
            };

            for item in bucket {
                let activity = Activity::from_content(item, style);
                if total + activity.duration_minutes > budget {
                    exhausted = true;
                    break;
                }
                total += activity.duration_minutes;
                module.estimated_duration += activity.duration_minutes;
                module.activities.push(activity);
            }

            if !module.activities.is_empty() {
                modules.push(module);
            }
            if exhausted || total >= budget {
                break;
            }
        }

        tracing::debug!(
            "Packed {} modules ({:.1} minutes) for {}",
            modules.len(),
            total,
            self.subject
        );

        LearningPath {
            difficulty_progression: modules.iter().map(|m| m.difficulty).collect(),
            modules,
            total_duration: total,
            learning_goals: self.learning_goals.clone(),
            user_level: start_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::educational::retriever::ContentMetadata;

    fn item(text: &str, difficulty: DifficultyLevel) -> ContentItem {
        ContentItem {
            text: text.to_string(),
            metadata: ContentMetadata {
                difficulty,
                learning_goal: "photosynthesis".to_string(),
                ..ContentMetadata::default()
            },
            relevance: 0.9,
        }
    }

    fn packer() -> ModulePacker {
        ModulePacker::new("Biology", vec!["photosynthesis".to_string()])
    }

    #[test]
    fn budget_stops_packing_at_first_overflow() {
        let content = vec![
            item("one", DifficultyLevel::Beginner),
            item("two", DifficultyLevel::Beginner),
            item("three", DifficultyLevel::Beginner),
        ];
        let path = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Visual,
            Some(100.0),
        );

        assert_eq!(path.modules.len(), 1);
        assert_eq!(path.modules[0].activities.len(), 2);
        assert_eq!(path.modules[0].title, "Beginner Biology");
        assert!((path.total_duration - 72.0).abs() < 1e-9);
        assert_eq!(path.difficulty_progression, vec![DifficultyLevel::Beginner]);
    }

    #[test]
    fn overflow_does_not_continue_into_higher_levels() {
        let content = vec![
            item("b1", DifficultyLevel::Beginner),
            item("b2", DifficultyLevel::Beginner),
            item("a1", DifficultyLevel::Advanced),
        ];
        let path = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Reading,
            Some(45.0),
        );
        assert_eq!(path.modules.len(), 1);
        assert_eq!(path.total_duration, 30.0);
    }

    #[test]
    fn unbounded_budget_yields_one_module_per_non_empty_level() {
        let content = vec![
            item("e", DifficultyLevel::Expert),
            item("b", DifficultyLevel::Beginner),
            item("i1", DifficultyLevel::Intermediate),
            item("i2", DifficultyLevel::Intermediate),
        ];
        let path = packer().pack(
            &content,
            DifficultyLevel::Intermediate,
            LearningStyle::Kinesthetic,
            None,
        );

        assert_eq!(
            path.difficulty_progression,
            vec![DifficultyLevel::Intermediate, DifficultyLevel::Expert]
        );
        let texts: Vec<&str> = path.modules[0]
            .activities
            .iter()
            .map(|a| a.content.as_str())
            .collect();
        assert_eq!(texts, vec!["i1", "i2"]);
        assert_eq!(path.user_level, DifficultyLevel::Intermediate);
    }

    #[test]
    fn interactive_elements_follow_activity_type() {
        let content = vec![item("x", DifficultyLevel::Beginner)];

        let kinesthetic = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Kinesthetic,
            None,
        );
        let activity = &kinesthetic.modules[0].activities[0];
        assert_eq!(activity.kind, ActivityType::InteractiveExercise);
        assert!((activity.duration_minutes - 39.0).abs() < 1e-9);
        assert!(matches!(
            activity.interactive_elements.as_slice(),
            [
                InteractiveElement::PracticeProblem { .. },
                InteractiveElement::Simulation { .. }
            ]
        ));

        let visual = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Visual,
            None,
        );
        assert!(matches!(
            visual.modules[0].activities[0].interactive_elements.as_slice(),
            [InteractiveElement::KnowledgeCheck { .. }]
        ));

        let auditory = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Auditory,
            None,
        );
        assert!(auditory.modules[0].activities[0].interactive_elements.is_empty());
    }

    #[test]
    fn style_labels_default_to_kinesthetic() {
        assert_eq!(LearningStyle::from_label("Visual"), LearningStyle::Visual);
        assert_eq!(LearningStyle::from_label("hands-on"), LearningStyle::Kinesthetic);
        let parsed: LearningStyle = "reading".parse().unwrap();
        assert_eq!(parsed, LearningStyle::Reading);
    }

    #[test]
    fn serialized_activity_uses_type_tags() {
        let content = vec![item("x", DifficultyLevel::Beginner)];
        let path = packer().pack(
            &content,
            DifficultyLevel::Beginner,
            LearningStyle::Visual,
            None,
        );
        let json = serde_json::to_value(&path.modules[0]).unwrap();
        assert_eq!(json["activities"][0]["type"], "video_lesson");
        assert_eq!(
            json["activities"][0]["interactive_elements"][0]["type"],
            "knowledge_check"
        );
        assert!(json.get("pre_assessment").is_none());
    }
}
