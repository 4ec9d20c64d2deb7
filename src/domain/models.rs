use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Question {
    pub id: i64,
    pub category_id: i64,
    pub content: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Test {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Join row between a test and one of its questions.
#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct TestQuestion {
    pub test_id: i64,
    pub question_id: i64,
    pub order_index: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TestWithQuestions {
    pub test: Test,
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Interview {
    pub id: i64,
    pub test_id: i64,
    pub candidate_name: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Interviewer {
    pub id: i64,
    pub interview_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct InterviewScore {
    pub id: i64,
    pub interview_id: i64,
    pub interviewer_id: i64,
    pub question_id: i64,
    pub score: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct InterviewQuestionAnswer {
    pub id: i64,
    pub interview_id: i64,
    pub question_id: i64,
    pub answer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("score must be a number between {min} and {max}, got {value}", min = Score::MIN, max = Score::MAX)]
pub struct ScoreOutOfRange {
    pub value: i64,
}

/// A single interviewer rating, always within `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Score(i16);

impl Score {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    pub fn value(self) -> i16 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Score(value as i16))
        } else {
            Err(ScoreOutOfRange { value })
        }
    }
}

impl From<Score> for i16 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Trims free text and collapses blank input to `None`.
pub fn normalize_notes(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
