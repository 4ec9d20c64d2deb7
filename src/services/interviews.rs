use crate::db::{Store, StoreResult};
use crate::domain::models::{
    Interview, InterviewQuestionAnswer, InterviewScore, Interviewer, Question, Test,
};
use crate::domain::scoring::{self, ScoreSummary};
use crate::services::composer;
use serde::Serialize;

/// Everything the interview page shows. Questions come from the test as it is now.
#[derive(Debug, Serialize)]
pub struct InterviewDetails {
    #[serde(flatten)]
    pub interview: Interview,
    pub test: Option<Test>,
    pub questions: Vec<Question>,
    pub interviewers: Vec<Interviewer>,
    pub scores: Vec<InterviewScore>,
    pub answers: Vec<InterviewQuestionAnswer>,
    pub summary: ScoreSummary,
}

pub async fn interview_details(store: &dyn Store, interview_id: i64) -> StoreResult<Option<InterviewDetails>> {
    let Some(interview) = store.get_interview(interview_id).await? else {
        return Ok(None);
    };

    let (interviewers, scores, answers, test_data, categories) = tokio::try_join!(
        store.list_interviewers(interview_id),
        store.list_scores(interview_id),
        store.list_answers(interview_id),
        composer::get_test_with_questions(store, interview.test_id),
        store.list_categories(),
    )?;

    let (test, questions) = match test_data {
        Some(data) => (Some(data.test), data.questions),
        None => (None, Vec::new()),
    };
    let summary = scoring::summarize(&categories, &questions, &interviewers, &scores);

    Ok(Some(InterviewDetails {
        interview,
        test,
        questions,
        interviewers,
        scores,
        answers,
        summary,
    }))
}

pub async fn interview_summary(store: &dyn Store, interview_id: i64) -> StoreResult<Option<ScoreSummary>> {
    Ok(interview_details(store, interview_id)
        .await?
        .map(|details| details.summary))
}
