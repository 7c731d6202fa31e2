//! Mapping between continuous proficiency levels and difficulty categories.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::retriever::ContentItem;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    /// Ascending order.
    pub const ALL: [DifficultyLevel; 4] = [
        DifficultyLevel::Beginner,
        DifficultyLevel::Intermediate,
        DifficultyLevel::Advanced,
        DifficultyLevel::Expert,
    ];

    /// Thresholds: `< 0.3` beginner, `< 0.6` intermediate, `< 0.8` advanced.
    pub fn from_level(level: f64) -> Self {
        if level < 0.3 {
            DifficultyLevel::Beginner
        } else if level < 0.6 {
            DifficultyLevel::Intermediate
        } else if level < 0.8 {
            DifficultyLevel::Advanced
        } else {
            DifficultyLevel::Expert
        }
    }

    pub fn anchor(&self) -> f64 {
        match self {
            DifficultyLevel::Beginner => 0.2,
            DifficultyLevel::Intermediate => 0.5,
            DifficultyLevel::Advanced => 0.7,
            DifficultyLevel::Expert => 0.9,
        }
    }

    /// Unrecognised or missing labels count as intermediate.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("beginner") => DifficultyLevel::Beginner,
            Some("advanced") => DifficultyLevel::Advanced,
            Some("expert") => DifficultyLevel::Expert,
            _ => DifficultyLevel::Intermediate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "Beginner",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::Advanced => "Advanced",
            DifficultyLevel::Expert => "Expert",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn level_to_category(level: f64) -> DifficultyLevel {
    DifficultyLevel::from_level(level)
}

pub fn category_to_anchor(category: DifficultyLevel) -> f64 {
    category.anchor()
}

fn distance(item: &ContentItem, target: f64) -> f64 {
    (item.metadata.difficulty.anchor() - target).abs()
}

/// The item whose difficulty anchor is nearest `target`; the first one wins ties.
pub fn select_closest(items: &[ContentItem], target: f64) -> Result<&ContentItem, RagError> {
    let mut best: Option<(&ContentItem, f64)> = None;
    for item in items {
        let d = distance(item, target);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((item, d)),
        }
    }
    best.map(|(item, _)| item)
        .ok_or_else(|| RagError::EmptyInput("no content items to select from".to_string()))
}

/// All items ordered by distance to `target`; equal distances keep input order.
pub fn rank_by_difficulty(items: &[ContentItem], target: f64) -> Vec<&ContentItem> {
    let mut ranked: Vec<&ContentItem> = items.iter().collect();
    ranked.sort_by(|a, b| {
        distance(a, target)
            .partial_cmp(&distance(b, target))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
