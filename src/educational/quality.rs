//! Heuristic quality checks for authored educational content.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::quiz::sentences;
use crate::core::config::QualityConfig;

static WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

const MEASURABLE_VERBS: &[&str] = &[
    "analyze",
    "apply",
    "calculate",
    "compare",
    "create",
    "define",
    "demonstrate",
    "describe",
    "design",
    "evaluate",
    "explain",
    "identify",
    "illustrate",
    "interpret",
    "organize",
    "plan",
    "predict",
    "solve",
    "summarize",
    "use",
];

const EXAMPLE_PHRASES: [&str; 3] = ["for example", "such as", "like"];

const MAX_AVG_SENTENCE_WORDS: f64 = 25.0;
const MAX_COMPLEX_RATIO: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub score: f64,
    pub suggestions: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            score: 1.0,
            suggestions: Vec::new(),
        }
    }

    fn zero(suggestion: &str) -> Self {
        Self {
            score: 0.0,
            suggestions: vec![suggestion.to_string()],
        }
    }

    fn penalise(&mut self, amount: f64, suggestion: String) {
        self.score -= amount;
        self.suggestions.push(suggestion);
    }

    fn finish(mut self) -> Self {
        self.score = self.score.max(0.0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityChecks {
    pub structure: CheckResult,
    pub completeness: CheckResult,
    pub readability: CheckResult,
    pub learning_objectives: CheckResult,
    pub engagement: CheckResult,
    pub accessibility: CheckResult,
}

impl QualityChecks {
    fn named(&self) -> [(&'static str, &CheckResult, f64); 6] {
        [
            ("Structure", &self.structure, 0.2),
            ("Completeness", &self.completeness, 0.2),
            ("Readability", &self.readability, 0.2),
            ("Learning Objectives", &self.learning_objectives, 0.15),
            ("Engagement", &self.engagement, 0.15),
            ("Accessibility", &self.accessibility, 0.1),
        ]
    }

    /// Weighted sum of the check scores, rounded to two decimals.
    pub fn weighted_score(&self) -> f64 {
        let sum: f64 = self
            .named()
            .iter()
            .map(|(_, result, weight)| result.score * weight)
            .sum();
        (sum * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub quality_score: f64,
    pub meets_minimum: bool,
    pub check_results: QualityChecks,
    pub summary: String,
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    }
}

fn array<'a>(content: &'a Value, key: &str) -> &'a [Value] {
    content
        .get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Title, description and section titles and bodies joined by spaces.
fn extract_text(content: &Value) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for key in ["title", "description"] {
        if let Some(text) = content.get(key).and_then(|v| v.as_str()) {
            parts.push(text);
        }
    }
    for section in array(content, "sections") {
        for key in ["title", "content"] {
            if let Some(text) = section.get(key).and_then(|v| v.as_str()) {
                parts.push(text);
            }
        }
    }
    parts.join(" ")
}

/// Vowel-closed letter groups, a rough syllable count.
fn syllable_groups(word: &str) -> usize {
    let chars: Vec<char> = word.to_lowercase().chars().collect();
    let is_vowel = |c: char| "aeiouy".contains(c);
    let mut groups = 0;
    let mut open = false;
    for (i, &c) in chars.iter().enumerate() {
        open = true;
        if is_vowel(c) && chars.get(i + 1).is_some_and(|&next| !is_vowel(next)) {
            groups += 1;
            open = false;
        }
    }
    if open {
        groups += 1;
    }
    groups
}

fn is_complex_word(word: &str) -> bool {
    word.chars().count() > 12 || syllable_groups(word) > 3
}

fn required_fields(content_type: &str) -> Vec<&'static str> {
    let extra: &[&'static str] = match content_type {
        "lesson" => &["learning_objectives", "sections"],
        "quiz" => &["questions", "scoring_rubric"],
        "exercise" => &["instructions", "solution"],
        "assessment" => &["criteria", "rubric"],
        _ => &[],
    };
    let mut fields = vec!["title", "description"];
    fields.extend_from_slice(extra);
    fields
}

fn min_words(content_type: &str) -> usize {
    match content_type {
        "lesson" => 500,
        "quiz" => 200,
        "exercise" => 300,
        "assessment" => 400,
        _ => 300,
    }
}

pub struct ContentQualityChecker {
    min_quality_score: f64,
    readability_target: String,
}

impl ContentQualityChecker {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            min_quality_score: config.min_quality_score,
            readability_target: config.readability_target.clone(),
        }
    }

    /// Runs every check on a JSON content object of the given type
    /// (`lesson`, `quiz`, `exercise`, `assessment` or anything else).
    pub fn validate_content(&self, content: &Value, content_type: &str) -> QualityReport {
        let text = extract_text(content);
        let checks = QualityChecks {
            structure: check_structure(content, content_type),
            completeness: check_completeness(content, &text, content_type),
            readability: check_readability(&text),
            learning_objectives: check_learning_objectives(content),
            engagement: check_engagement(content, &text),
            accessibility: check_accessibility(content),
        };
        let quality_score = checks.weighted_score();
        tracing::debug!("{} scored {:.2}", content_type, quality_score);

        QualityReport {
            quality_score,
            meets_minimum: quality_score >= self.min_quality_score,
            summary: self.summary(&checks, quality_score),
            check_results: checks,
        }
    }

    fn summary(&self, checks: &QualityChecks, quality_score: f64) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Overall Quality Score: {:.2}", quality_score);
        let _ = writeln!(out, "Minimum Required: {}", self.min_quality_score);
        let _ = writeln!(out, "Readability Target: {}", self.readability_target);
        for (name, result, _) in checks.named() {
            let _ = writeln!(out, "\n{}: {:.2}", name, result.score);
            for suggestion in &result.suggestions {
                let _ = writeln!(out, "- {}", suggestion);
            }
        }
        out.trim_end().to_string()
    }
}

fn check_structure(content: &Value, content_type: &str) -> CheckResult {
    let mut result = CheckResult::new();

    let missing: Vec<&str> = required_fields(content_type)
        .into_iter()
        .filter(|field| content.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        result.penalise(
            0.2 * missing.len() as f64,
            format!("Missing required fields: {}", missing.join(", ")),
        );
    }

    if let Some(sections) = content.get("sections").and_then(|v| v.as_array()) {
        if sections.is_empty() {
            result.penalise(0.3, "Content has no sections".to_string());
        } else {
            let untitled = sections.iter().filter(|s| !truthy(s.get("title"))).count();
            if untitled > 0 {
                result.penalise(
                    0.1 * untitled as f64,
                    format!("{} sections are missing titles", untitled),
                );
            }
        }
    }

    result.finish()
}

fn check_completeness(content: &Value, text: &str, content_type: &str) -> CheckResult {
    let mut result = CheckResult::new();

    let words = text.split_whitespace().count();
    let minimum = min_words(content_type);
    if words < minimum {
        result.penalise(
            0.5 * (1.0 - words as f64 / minimum as f64),
            format!(
                "Content is too short ({} words). Aim for at least {} words.",
                words, minimum
            ),
        );
    }

    let empty = array(content, "sections")
        .iter()
        .filter(|s| !truthy(s.get("content")))
        .count();
    if empty > 0 {
        result.penalise(0.2 * empty as f64, format!("{} sections are empty", empty));
    }

    result.finish()
}

fn check_readability(text: &str) -> CheckResult {
    if text.trim().is_empty() {
        return CheckResult::zero("No text content found");
    }
    let mut result = CheckResult::new();

    let lengths: Vec<usize> = sentences(text)
        .iter()
        .map(|s| s.split_whitespace().count())
        .collect();
    if !lengths.is_empty() {
        let average = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        if average > MAX_AVG_SENTENCE_WORDS {
            result.penalise(
                0.2,
                format!(
                    "Average sentence length ({:.1} words) is too high. \
                     Aim for 15-20 words per sentence.",
                    average
                ),
            );
        }
    }

    let words: Vec<&str> = WORDS.find_iter(text).map(|m| m.as_str()).collect();
    if !words.is_empty() {
        let complex = words.iter().filter(|w| is_complex_word(w)).count();
        let ratio = complex as f64 / words.len() as f64;
        if ratio > MAX_COMPLEX_RATIO {
            result.penalise(
                0.2,
                format!(
                    "{:.1}% of words are complex. Consider using simpler vocabulary.",
                    ratio * 100.0
                ),
            );
        }
    }

    result.finish()
}

fn check_learning_objectives(content: &Value) -> CheckResult {
    let objectives: Vec<&str> = array(content, "learning_objectives")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    if objectives.is_empty() {
        return CheckResult::zero("No learning objectives found");
    }
    let mut result = CheckResult::new();

    for objective in objectives {
        let lower = objective.to_lowercase();
        if !MEASURABLE_VERBS.iter().any(|verb| lower.contains(verb)) {
            result.penalise(
                0.2,
                format!(
                    "Objective '{}' lacks measurable verbs. \
                     Use verbs like 'explain', 'analyze', 'apply'.",
                    objective
                ),
            );
        }
        if objective.split_whitespace().count() < 3 {
            result.penalise(
                0.1,
                format!(
                    "Objective '{}' is too brief. Provide more specific details.",
                    objective
                ),
            );
        }
    }

    result.finish()
}

fn check_engagement(content: &Value, text: &str) -> CheckResult {
    let mut result = CheckResult::new();

    if array(content, "interactive_elements").is_empty() {
        result.penalise(
            0.3,
            "No interactive elements found. Consider adding quizzes, \
             exercises, or discussion prompts."
                .to_string(),
        );
    }
    if array(content, "multimedia").is_empty() {
        result.penalise(
            0.2,
            "No multimedia content found. Consider adding images, \
             videos, or audio elements."
                .to_string(),
        );
    }
    let lower = text.to_lowercase();
    if !EXAMPLE_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        result.penalise(
            0.2,
            "Few or no examples found. Include real-world examples to illustrate concepts."
                .to_string(),
        );
    }

    result.finish()
}

fn check_accessibility(content: &Value) -> CheckResult {
    let mut result = CheckResult::new();

    let checks = [
        ("images", "alt_text", "images are missing alt text"),
        ("videos", "captions", "videos are missing captions"),
        (
            "multimedia",
            "text_alternative",
            "multimedia elements are missing text alternatives",
        ),
    ];
    for (collection, field, message) in checks {
        let items = array(content, collection);
        let missing = items.iter().filter(|item| !truthy(item.get(field))).count();
        if missing > 0 {
            result.penalise(
                0.2 * missing as f64 / items.len() as f64,
                format!("{} {}", missing, message),
            );
        }
    }

    result.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checker() -> ContentQualityChecker {
        ContentQualityChecker::new(&QualityConfig::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn structure_penalises_missing_fields_and_untitled_sections() {
        let content = json!({
            "title": "Cells",
            "sections": [{ "content": "x" }, { "title": "", "content": "y" }, { "title": "Ok" }]
        });
        let result = check_structure(&content, "lesson");
        assert!(approx(result.score, 1.0 - 0.4 - 0.2));
        assert_eq!(
            result.suggestions[0],
            "Missing required fields: description, learning_objectives"
        );

        let empty = check_structure(
            &json!({ "title": "t", "description": "d", "sections": [] }),
            "other",
        );
        assert!(approx(empty.score, 0.7));
    }

    #[test]
    fn completeness_scales_with_word_count() {
        let text = vec!["word"; 150].join(" ");
        let content = json!({ "title": text, "sections": [{ "title": "a" }] });
        let result = check_completeness(&content, &extract_text(&content), "exercise");
        // 151 of 300 words, one empty section
        assert!(approx(result.score, 1.0 - 0.5 * (1.0 - 151.0 / 300.0) - 0.2));
        assert_eq!(result.suggestions.len(), 2);
    }

    #[test]
    fn readability_flags_long_sentences_and_complex_words() {
        assert_eq!(check_readability("").score, 0.0);
        assert_eq!(check_readability("The cat sat on the mat. It was warm.").score, 1.0);

        let long = format!("{}.", vec!["cat"; 30].join(" "));
        assert!(approx(check_readability(&long).score, 0.8));

        let complex = "Photosynthesis internationalization characterization.";
        let result = check_readability(complex);
        assert!(approx(result.score, 0.8));
        assert!(result.suggestions[0].contains("complex"));
    }

    #[test]
    fn syllable_groups_close_on_vowel_before_consonant() {
        assert_eq!(syllable_groups("cat"), 2);
        assert_eq!(syllable_groups("the"), 1);
        assert!(is_complex_word("phenomena"));
        assert!(!is_complex_word("simple"));
    }

    #[test]
    fn objectives_need_measurable_verbs_and_detail() {
        assert_eq!(check_learning_objectives(&json!({})).score, 0.0);

        let content = json!({
            "learning_objectives": ["Explain how cells divide", "Cells", "Know the parts of an atom"]
        });
        let result = check_learning_objectives(&content);
        // "Cells" lacks a verb and is brief; the third lacks a verb
        assert!(approx(result.score, 1.0 - 0.3 - 0.2));
        assert_eq!(result.suggestions.len(), 3);
    }

    #[test]
    fn engagement_and_accessibility() {
        let bare = check_engagement(&json!({}), "plain text");
        assert!(approx(bare.score, 0.3));

        let rich = json!({
            "interactive_elements": [{ "type": "quiz" }],
            "multimedia": [{ "text_alternative": "transcript" }, {}],
            "images": [{ "alt_text": "diagram" }, { "alt_text": "" }, {}, { "alt_text": "x" }],
            "videos": [{ "captions": true }]
        });
        assert!(approx(check_engagement(&rich, "Enzymes such as amylase").score, 1.0));

        let access = check_accessibility(&rich);
        assert!(approx(access.score, 1.0 - 0.2 * 0.5 - 0.2 * 0.5));
        assert_eq!(access.suggestions.len(), 2);
    }

    #[test]
    fn weighted_score_uses_fixed_weights() {
        let perfect = CheckResult::new;
        let mut checks = QualityChecks {
            structure: perfect(),
            completeness: perfect(),
            readability: perfect(),
            learning_objectives: perfect(),
            engagement: perfect(),
            accessibility: perfect(),
        };
        assert_eq!(checks.weighted_score(), 1.0);

        checks.learning_objectives.score = 0.0;
        checks.accessibility.score = 0.5;
        assert_eq!(checks.weighted_score(), 0.8);
    }

    #[test]
    fn report_applies_minimum_and_summarises() {
        let content = json!({
            "title": "Introduction to Quantum Computing",
            "sections": [{ "title": "Basic Concepts", "content": "Quantum computing uses quantum phenomena." }]
        });
        let report = checker().validate_content(&content, "lesson");
        assert!(!report.meets_minimum);
        assert!(report.quality_score < 0.7);
        assert_eq!(report.check_results.learning_objectives.score, 0.0);
        assert!(report.summary.starts_with("Overall Quality Score:"));
        assert!(report.summary.contains("Learning Objectives: 0.00"));
        assert!(report.summary.contains("- No learning objectives found"));
    }
}
