use crate::db::InterviewUpdate;
use crate::domain::models::{
    normalize_notes, Interview, InterviewQuestionAnswer, InterviewScore, Interviewer, Score,
};
use crate::domain::scoring::{self, ScoreSummary};
use crate::services::interviews::{self, InterviewDetails};
use crate::state::SharedState;
use crate::web::error::{required_text, ApiError, ApiJson, ApiPath, ApiQuery};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateInterviewPayload {
    pub test_id: i64,
    pub candidate_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterviewPayload {
    pub candidate_name: Option<String>,
    /// Present replaces the feedback; an empty string clears it.
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewerPayload {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ScorePayload {
    pub interviewer_id: i64,
    pub question_id: i64,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct AnswerPayload {
    pub question_id: i64,
    pub answer_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreLookupQuery {
    pub interviewer_id: i64,
    pub question_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ScoreLookup {
    pub interviewer_id: i64,
    pub question_id: i64,
    pub score: Option<i16>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_interviews).post(create_interview))
        .route("/:id", get(get_interview).put(update_interview))
        .route("/:id/interviewers", get(list_interviewers).post(create_interviewer))
        .route("/:id/scores", get(list_scores).post(upsert_score).put(upsert_score))
        .route("/:id/scores/lookup", get(lookup_score))
        .route("/:id/answers", get(list_answers).post(upsert_answer))
        .route("/:id/summary", get(get_summary))
        .with_state(state)
}

async fn require_interview(state: &SharedState, id: i64) -> Result<Interview, ApiError> {
    state
        .store
        .get_interview(id)
        .await
        .map_err(ApiError::store("Failed to fetch interview"))?
        .ok_or(ApiError::NotFound("Interview"))
}

async fn list_interviews(State(state): State<SharedState>) -> Result<Json<Vec<Interview>>, ApiError> {
    let interviews = state
        .store
        .list_interviews()
        .await
        .map_err(ApiError::store("Failed to fetch interviews"))?;
    Ok(Json(interviews))
}

async fn create_interview(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateInterviewPayload>,
) -> Result<(StatusCode, Json<Interview>), ApiError> {
    let candidate_name = required_text(&payload.candidate_name, "Candidate name is required")?;
    state
        .store
        .get_test(payload.test_id)
        .await
        .map_err(ApiError::store("Failed to fetch test"))?
        .ok_or(ApiError::NotFound("Test"))?;

    let interview = state
        .store
        .create_interview(payload.test_id, &candidate_name)
        .await
        .map_err(ApiError::store("Failed to create interview"))?;

    tracing::info!("Created interview {} on test {}", interview.id, interview.test_id);
    Ok((StatusCode::CREATED, Json(interview)))
}

async fn get_interview(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<InterviewDetails>, ApiError> {
    interviews::interview_details(state.store.as_ref(), id)
        .await
        .map_err(ApiError::store("Failed to fetch interview"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Interview"))
}

async fn update_interview(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateInterviewPayload>,
) -> Result<Json<Interview>, ApiError> {
    let candidate_name = payload
        .candidate_name
        .as_deref()
        .map(|n| required_text(n, "Candidate name must be a non-empty string"))
        .transpose()?;
    let feedback = payload.feedback.as_deref().map(|f| normalize_notes(Some(f)));

    let interview = state
        .store
        .update_interview(
            id,
            InterviewUpdate {
                candidate_name,
                feedback,
            },
        )
        .await
        .map_err(ApiError::store("Failed to update interview"))?
        .ok_or(ApiError::NotFound("Interview"))?;

    tracing::info!("Updated interview {}", interview.id);
    Ok(Json(interview))
}

async fn list_interviewers(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<Interviewer>>, ApiError> {
    require_interview(&state, id).await?;
    let interviewers = state
        .store
        .list_interviewers(id)
        .await
        .map_err(ApiError::store("Failed to fetch interviewers"))?;
    Ok(Json(interviewers))
}

async fn create_interviewer(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<InterviewerPayload>,
) -> Result<(StatusCode, Json<Interviewer>), ApiError> {
    let name = required_text(&payload.name, "Interviewer name is required")?;
    require_interview(&state, id).await?;

    let interviewer = state
        .store
        .create_interviewer(id, &name)
        .await
        .map_err(ApiError::store("Failed to create interviewer"))?;

    tracing::info!("Added interviewer {} to interview {}", interviewer.id, id);
    Ok((StatusCode::CREATED, Json(interviewer)))
}

async fn list_scores(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<InterviewScore>>, ApiError> {
    require_interview(&state, id).await?;
    let scores = state
        .store
        .list_scores(id)
        .await
        .map_err(ApiError::store("Failed to fetch scores"))?;
    Ok(Json(scores))
}

async fn upsert_score(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ScorePayload>,
) -> Result<Json<InterviewScore>, ApiError> {
    let score = Score::try_from(payload.score)
        .map_err(|_| ApiError::bad_request("Score must be a number between 1 and 5"))?;
    require_interview(&state, id).await?;

    let interviewer = state
        .store
        .get_interviewer(payload.interviewer_id)
        .await
        .map_err(ApiError::store("Failed to fetch interviewer"))?
        .filter(|i| i.interview_id == id)
        .ok_or(ApiError::NotFound("Interviewer"))?;
    state
        .store
        .get_question(payload.question_id)
        .await
        .map_err(ApiError::store("Failed to fetch question"))?
        .ok_or(ApiError::NotFound("Question"))?;

    let row = state
        .store
        .upsert_score(id, interviewer.id, payload.question_id, score)
        .await
        .map_err(ApiError::store("Failed to update score"))?;

    tracing::info!(
        "Interview {}: interviewer {} scored question {} as {}",
        id,
        interviewer.id,
        payload.question_id,
        row.score
    );
    Ok(Json(row))
}

async fn lookup_score(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ScoreLookupQuery>,
) -> Result<Json<ScoreLookup>, ApiError> {
    require_interview(&state, id).await?;
    let scores = state
        .store
        .list_scores(id)
        .await
        .map_err(ApiError::store("Failed to fetch scores"))?;

    Ok(Json(ScoreLookup {
        interviewer_id: query.interviewer_id,
        question_id: query.question_id,
        score: scoring::score_for(&scores, query.interviewer_id, query.question_id),
    }))
}

async fn list_answers(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<InterviewQuestionAnswer>>, ApiError> {
    require_interview(&state, id).await?;
    let answers = state
        .store
        .list_answers(id)
        .await
        .map_err(ApiError::store("Failed to fetch answer notes"))?;
    Ok(Json(answers))
}

async fn upsert_answer(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AnswerPayload>,
) -> Result<Json<InterviewQuestionAnswer>, ApiError> {
    require_interview(&state, id).await?;
    state
        .store
        .get_question(payload.question_id)
        .await
        .map_err(ApiError::store("Failed to fetch question"))?
        .ok_or(ApiError::NotFound("Question"))?;

    let answer = state
        .store
        .upsert_answer(id, payload.question_id, normalize_notes(payload.answer_notes.as_deref()))
        .await
        .map_err(ApiError::store("Failed to update answer notes"))?;

    tracing::info!("Interview {}: saved answer notes for question {}", id, answer.question_id);
    Ok(Json(answer))
}

async fn get_summary(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ScoreSummary>, ApiError> {
    interviews::interview_summary(state.store.as_ref(), id)
        .await
        .map_err(ApiError::store("Failed to fetch interview summary"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Interview"))
}
