use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use learnhub_types::{Challenge, Level, QuizCategory, QuizQuestion, SubmissionRecord, UserProgress};

use super::data::{DataService, Query};
use super::error::ServiceError;

pub const CHALLENGES: &str = "challenges";
pub const QUIZ_QUESTIONS: &str = "quiz_questions";
pub const USER_PROGRESS: &str = "user_progress";

/// Typed access to the challenge, quiz and progress collections.
#[derive(Clone)]
pub struct Catalog {
    data: Arc<dyn DataService>,
}

impl Catalog {
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Arc<dyn DataService> {
        &self.data
    }

    pub async fn challenges(&self, level: Level) -> Result<Vec<Challenge>, ServiceError> {
        let query = Query::new(CHALLENGES)
            .eq("level", level.as_str())
            .order("order_index");
        decode_rows(self.data.select(&query).await?)
    }

    pub async fn quiz_questions(
        &self,
        category: QuizCategory,
    ) -> Result<Vec<QuizQuestion>, ServiceError> {
        let query = Query::new(QUIZ_QUESTIONS)
            .eq("category", category.as_str())
            .order("order_index");
        decode_rows(self.data.select(&query).await?)
    }

    /// Ids of challenges this session has completed.
    pub async fn completed_challenges(
        &self,
        session_id: &str,
    ) -> Result<BTreeSet<String>, ServiceError> {
        let query = Query::new(USER_PROGRESS)
            .eq("session_id", session_id)
            .eq("completed", true);
        let rows: Vec<UserProgress> = decode_rows(self.data.select(&query).await?)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.challenge_id.filter(|id| !id.is_empty()))
            .collect())
    }

    pub async fn record_submission(&self, record: &SubmissionRecord) -> Result<(), ServiceError> {
        let row = serde_json::to_value(record)?;
        self.data.insert(USER_PROGRESS, vec![row]).await
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, ServiceError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ServiceError::from))
        .collect()
}
