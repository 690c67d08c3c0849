//! Rows stored in the data service collections.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeCategory {
    Html,
    Css,
    Javascript,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizCategory {
    Html,
    Css,
    Mixed,
}

impl QuizCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizCategory::Html => "html",
            QuizCategory::Css => "css",
            QuizCategory::Mixed => "mixed",
        }
    }
}

/// A row of the `challenges` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: Level,
    pub category: ChallengeCategory,
    #[serde(default)]
    pub starter_html: String,
    #[serde(default)]
    pub starter_css: String,
    #[serde(default)]
    pub starter_js: String,
    #[serde(default)]
    pub reference_image_url: String,
    #[serde(default)]
    pub order_index: i64,
}

/// A row of the `quiz_questions` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub category: QuizCategory,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub order_index: i64,
}

/// A row of the `user_progress` collection as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(default)]
    pub id: Option<String>,
    pub session_id: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
    #[serde(default)]
    pub quiz_category: Option<String>,
    #[serde(default)]
    pub quiz_score: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub code_html: Option<String>,
    #[serde(default)]
    pub code_css: Option<String>,
    #[serde(default)]
    pub code_js: Option<String>,
}

/// The `user_progress` row written once per accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub session_id: String,
    pub challenge_id: String,
    #[serde(rename = "code_html")]
    pub html: String,
    #[serde(rename = "code_css")]
    pub css: String,
    #[serde(rename = "code_js")]
    pub js: String,
    pub completed: bool,
    pub score: u32,
    pub mistakes: u32,
    pub attempts: u32,
}
