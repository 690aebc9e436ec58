//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the study-set REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use crate::error::ApiError;
use crate::web::generation_task::run_refinement;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_set_core::domain::{NewStudySet, QuestionRecord, StudySet, StudySetKind, StudySetSummary};
use study_set_core::play::QuizPlayState;
use study_set_core::ports::PortError;
use study_set_core::prompt::RefineAction;
use study_set_core::session::SessionError;
use study_set_core::study::StudyDeck;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_study_set_handler,
        list_study_sets_handler,
        get_study_set_handler,
        update_study_set_handler,
        delete_study_set_handler,
        quiz_handler,
        study_card_handler,
        refine_card_handler,
    ),
    components(
        schemas(
            StudySetRequest, StudySetResponse, StudySetSummaryResponse, QuizResponse,
            QuizQuestionResponse, StudyCardResponse, RefineCardRequest, FlashcardResponse
        )
    ),
    tags(
        (name = "Study Set API", description = "Stored flashcard and quiz sets, quiz play-through views, study mode, and card refinement.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A study set to store or to write over an existing one, in the same shape a
/// finalized generation produces.
#[derive(Deserialize, ToSchema)]
pub struct StudySetRequest {
    title: String,
    description: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "quiz")]
    kind: StudySetKind,
    /// `{question, answer}` for flashcards, `{question, correct_answer, incorrect_answers}` for quizzes.
    #[schema(value_type = Vec<Object>)]
    questions: Vec<QuestionRecord>,
}

impl From<StudySetRequest> for NewStudySet {
    fn from(payload: StudySetRequest) -> Self {
        NewStudySet {
            title: payload.title,
            description: payload.description,
            kind: payload.kind,
            questions: payload.questions,
        }
    }
}

/// Narrows the library listing to one kind of set.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    /// `flashcards` or `quiz`; omit for every set.
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    kind: Option<StudySetKind>,
}

#[derive(Serialize, ToSchema)]
pub struct StudySetResponse {
    id: Uuid,
    title: String,
    description: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "flashcards")]
    kind: StudySetKind,
    #[schema(value_type = Vec<Object>)]
    questions: Vec<QuestionRecord>,
    created_at: DateTime<Utc>,
}

impl From<StudySet> for StudySetResponse {
    fn from(set: StudySet) -> Self {
        Self {
            id: set.id,
            title: set.title,
            description: set.description,
            kind: set.kind,
            questions: set.questions,
            created_at: set.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudySetSummaryResponse {
    id: Uuid,
    title: String,
    description: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "quiz")]
    kind: StudySetKind,
    question_count: usize,
    created_at: DateTime<Utc>,
}

impl From<StudySetSummary> for StudySetSummaryResponse {
    fn from(summary: StudySetSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            description: summary.description,
            kind: summary.kind,
            question_count: summary.question_count,
            created_at: summary.created_at,
        }
    }
}

/// One question of a play-through, with its options already shuffled.
#[derive(Serialize, ToSchema)]
pub struct QuizQuestionResponse {
    prompt: String,
    correct_answer: String,
    options: Vec<String>,
}

/// A freshly dealt play-through: question order and option order are new on every request.
#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    study_set_id: Uuid,
    title: String,
    questions: Vec<QuizQuestionResponse>,
}

/// One card of a flashcard set in study mode, question and answer both included.
#[derive(Serialize, ToSchema)]
pub struct StudyCardResponse {
    question: String,
    answer: String,
    position: usize,
    total: usize,
    has_previous: bool,
    has_next: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct RefineCardRequest {
    /// `harder`, `simplify` or `rephrase`.
    #[schema(value_type = String, example = "harder")]
    action: RefineAction,
    question: String,
    answer: String,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardResponse {
    question: String,
    answer: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Unavailable(message) => {
            error!("Failed to {}: {}", action, message);
            (StatusCode::SERVICE_UNAVAILABLE, format!("Failed to {}", action))
        }
        PortError::Unexpected(message) => {
            error!("Failed to {}: {}", action, message);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
        }
    }
}

fn validate(payload: &StudySetRequest) -> Result<(), String> {
    if payload.title.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    if payload.questions.is_empty() {
        return Err("a study set needs at least one question".to_string());
    }
    for (index, question) in payload.questions.iter().enumerate() {
        if question.kind() != payload.kind {
            return Err(format!("question {} does not match the set type '{}'", index + 1, payload.kind));
        }
        if let Some(field) = question.blank_field() {
            return Err(format!("question {} has an empty {}", index + 1, field));
        }
    }
    Ok(())
}

fn generation_error_response(e: ApiError) -> (StatusCode, String) {
    match e {
        ApiError::Prompt(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        ApiError::Generation(SessionError::StreamTransport(reason)) => {
            error!("Refinement failed: {}", reason);
            (StatusCode::BAD_GATEWAY, format!("The generator failed: {}", reason))
        }
        ApiError::Generation(SessionError::IncompleteGeneration) => (
            StatusCode::BAD_GATEWAY,
            "The generator did not return a flashcard".to_string(),
        ),
        other => {
            error!("Refinement failed: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to refine the card".to_string())
        }
    }
}

/// Store a study set.
#[utoipa::path(
    post,
    path = "/study-sets",
    request_body = StudySetRequest,
    responses(
        (status = 201, description = "Study set stored", body = StudySetResponse),
        (status = 400, description = "Empty title or field, no questions, or questions of the wrong type"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_study_set_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<StudySetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&payload).map_err(|message| (StatusCode::BAD_REQUEST, message))?;

    let stored = app_state
        .store
        .persist(payload.into())
        .await
        .map_err(|e| port_error_response(e, "store the study set"))?;

    info!(id = %stored.id, "Study set stored.");
    Ok((StatusCode::CREATED, Json(StudySetResponse::from(stored))))
}

/// List stored study sets, newest first.
#[utoipa::path(
    get,
    path = "/study-sets",
    params(ListFilter),
    responses(
        (status = 200, description = "Study set summaries", body = [StudySetSummaryResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_study_sets_handler(
    State(app_state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summaries = app_state
        .store
        .list()
        .await
        .map_err(|e| port_error_response(e, "list study sets"))?;

    let response: Vec<StudySetSummaryResponse> = summaries
        .into_iter()
        .filter(|summary| filter.kind.map_or(true, |kind| summary.kind == kind))
        .map(Into::into)
        .collect();
    Ok(Json(response))
}

/// Fetch one study set with all its questions.
#[utoipa::path(
    get,
    path = "/study-sets/{id}",
    params(("id" = Uuid, Path, description = "The study set id.")),
    responses(
        (status = 200, description = "The study set", body = StudySetResponse),
        (status = 404, description = "No study set with this id")
    )
)]
pub async fn get_study_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let set = app_state
        .store
        .fetch(id)
        .await
        .map_err(|e| port_error_response(e, "fetch the study set"))?;
    Ok(Json(StudySetResponse::from(set)))
}

/// Replace the title, description and questions of a study set.
///
/// The set keeps its id and creation time. It must keep at least one question.
#[utoipa::path(
    put,
    path = "/study-sets/{id}",
    params(("id" = Uuid, Path, description = "The study set id.")),
    request_body = StudySetRequest,
    responses(
        (status = 200, description = "Study set updated", body = StudySetResponse),
        (status = 400, description = "Empty title or field, no questions, or questions of the wrong type"),
        (status = 404, description = "No study set with this id")
    )
)]
pub async fn update_study_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudySetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&payload).map_err(|message| (StatusCode::BAD_REQUEST, message))?;

    let updated = app_state
        .store
        .update(id, payload.into())
        .await
        .map_err(|e| port_error_response(e, "update the study set"))?;

    info!(%id, "Study set updated.");
    Ok(Json(StudySetResponse::from(updated)))
}

/// Delete a study set.
#[utoipa::path(
    delete,
    path = "/study-sets/{id}",
    params(("id" = Uuid, Path, description = "The study set id.")),
    responses(
        (status = 204, description = "Study set deleted"),
        (status = 404, description = "No study set with this id")
    )
)]
pub async fn delete_study_set_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .store
        .delete(id)
        .await
        .map_err(|e| port_error_response(e, "delete the study set"))?;

    info!(%id, "Study set deleted.");
    Ok(StatusCode::NO_CONTENT)
}

/// Deal a new quiz play-through for a study set.
///
/// Quiz sets use their authored wrong answers; flashcard sets borrow answers
/// from sibling cards and pad with placeholders.
#[utoipa::path(
    get,
    path = "/study-sets/{id}/quiz",
    params(("id" = Uuid, Path, description = "The study set id.")),
    responses(
        (status = 200, description = "A shuffled play-through", body = QuizResponse),
        (status = 404, description = "No study set with this id"),
        (status = 422, description = "The study set has no questions")
    )
)]
pub async fn quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let set = app_state
        .store
        .fetch(id)
        .await
        .map_err(|e| port_error_response(e, "fetch the study set"))?;

    let play = QuizPlayState::start_fresh(set.questions)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let questions = play
        .questions()
        .iter()
        .map(|q| QuizQuestionResponse {
            prompt: q.prompt.clone(),
            correct_answer: q.correct_answer.clone(),
            options: q.options.clone(),
        })
        .collect();

    Ok(Json(QuizResponse {
        study_set_id: set.id,
        title: set.title,
        questions,
    }))
}

/// Show one card of a flashcard set in study mode.
#[utoipa::path(
    get,
    path = "/study-sets/{id}/cards/{position}",
    params(
        ("id" = Uuid, Path, description = "The study set id."),
        ("position" = usize, Path, description = "One-based card position.")
    ),
    responses(
        (status = 200, description = "The card at this position", body = StudyCardResponse),
        (status = 404, description = "No study set with this id, or no card at this position"),
        (status = 422, description = "The study set is not a flashcard set")
    )
)]
pub async fn study_card_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, position)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let set = app_state
        .store
        .fetch(id)
        .await
        .map_err(|e| port_error_response(e, "fetch the study set"))?;

    if set.kind != StudySetKind::Flashcards {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Study mode needs a flashcard set".to_string(),
        ));
    }
    let mut deck = StudyDeck::new(set.questions).ok_or_else(|| {
        (StatusCode::UNPROCESSABLE_ENTITY, "The study set has no cards".to_string())
    })?;
    if !deck.seek(position) {
        return Err((StatusCode::NOT_FOUND, format!("No card at position {}", position)));
    }

    let card = deck.current();
    Ok(Json(StudyCardResponse {
        question: card.question.to_string(),
        answer: card.answer.to_string(),
        position: card.position,
        total: card.total,
        has_previous: deck.has_previous(),
        has_next: deck.has_next(),
    }))
}

/// Rewrite one flashcard: make it harder, simpler, or reword it.
///
/// Nothing is stored; the client puts the returned card into the set and saves
/// it with `PUT /study-sets/{id}`.
#[utoipa::path(
    post,
    path = "/refine",
    request_body = RefineCardRequest,
    responses(
        (status = 200, description = "The rewritten card", body = FlashcardResponse),
        (status = 400, description = "Blank question or answer"),
        (status = 502, description = "The generator failed or returned no card")
    )
)]
pub async fn refine_card_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RefineCardRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let card = QuestionRecord::flashcard(payload.question, payload.answer);
    let refined = run_refinement(
        app_state.generator.as_ref(),
        payload.action,
        &card,
        app_state.config.generation_deadline,
    )
    .await
    .map_err(generation_error_response)?;

    Ok(Json(FlashcardResponse {
        question: refined.prompt().to_string(),
        answer: refined.correct_answer().to_string(),
    }))
}
