use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use duel::{Difficulty, DuelError, DuelId, DuelStatus, DuelView, RoundView, Side, UserId};

use crate::events::OpsEvent;
use crate::sse;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/duels/challenge", post(create_challenge))
        .route("/duels/pending", get(pending))
        .route("/duels/active", get(active))
        .route("/duels/{id}", get(get_duel))
        .route("/duels/{id}/accept", post(accept))
        .route("/duels/{id}/decline", post(decline))
        .route("/duels/{id}/answer", post(answer))
        .route("/events", get(sse::user_events))
        .route("/duels/{id}/events", get(sse::duel_events))
        .with_state(state)
}

/// Request-scoped identity. Authentication itself is external; the gateway
/// forwards the verified user id in this header.
pub struct Caller(pub UserId);

const USER_HEADER: &str = "x-user-id";

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<UserId>().ok())
            .map(Caller)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Duel(DuelError),
}

impl From<DuelError> for ApiError {
    fn from(err: DuelError) -> Self {
        ApiError::Duel(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Duel(err) => match err {
                DuelError::NotFound(_) => StatusCode::NOT_FOUND,
                DuelError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                DuelError::InvalidParticipant => StatusCode::UNPROCESSABLE_ENTITY,
                DuelError::InvalidState { .. }
                | DuelError::AlreadyInDuel(_)
                | DuelError::DuplicateAnswer { .. }
                | DuelError::RoundMismatch { .. }
                | DuelError::NoQuestionsAvailable { .. } => StatusCode::CONFLICT,
                DuelError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Duel(err) => match err {
                DuelError::NotFound(_) => "not_found",
                DuelError::NotAuthorized(_) => "not_authorized",
                DuelError::InvalidParticipant => "invalid_participant",
                DuelError::InvalidState { .. } => "invalid_state",
                DuelError::AlreadyInDuel(_) => "already_in_duel",
                DuelError::DuplicateAnswer { .. } => "duplicate_answer",
                DuelError::RoundMismatch { .. } => "round_mismatch",
                DuelError::NoQuestionsAvailable { .. } => "no_questions_available",
                DuelError::Unavailable(_) => "unavailable",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated => format!("missing or malformed {} header", USER_HEADER),
            ApiError::Duel(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeRequest {
    opponent_id: UserId,
    subject: String,
    #[serde(default)]
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    round_number: u32,
    answer_index: usize,
}

async fn create_challenge(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<DuelView>, ApiError> {
    let duel = state
        .service
        .create_challenge(user, req.opponent_id, req.subject, req.difficulty)?;
    state.emit(OpsEvent::ChallengeCreated {
        duel_id: duel.id,
        challenger: user,
        opponent: req.opponent_id,
    });
    Ok(Json(DuelView::of(&duel, Side::Challenger)))
}

async fn accept(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<DuelId>,
) -> Result<Json<DuelView>, ApiError> {
    let duel = state.service.accept(id, user).await?;
    state.emit(OpsEvent::DuelStarted { duel_id: id });
    Ok(Json(DuelView::of(&duel, Side::Opponent)))
}

async fn decline(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<DuelId>,
) -> Result<StatusCode, ApiError> {
    state.service.decline(id, user).await?;
    state.emit(OpsEvent::DuelCancelled {
        duel_id: id,
        reason: duel::CancelReason::Declined,
    });
    Ok(StatusCode::NO_CONTENT)
}

async fn answer(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<DuelId>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<RoundView>, ApiError> {
    let (round, side) = state
        .service
        .submit_answer(id, user, req.round_number, req.answer_index)
        .await?;

    if round.is_resolved() {
        match state.service.get(id, user) {
            Ok((duel, _)) => {
                let event = match duel.status {
                    DuelStatus::Completed => duel
                        .winner
                        .map(|winner| OpsEvent::DuelCompleted { duel_id: id, winner }),
                    DuelStatus::Cancelled => duel
                        .cancel_reason
                        .map(|reason| OpsEvent::DuelCancelled { duel_id: id, reason }),
                    _ => Some(OpsEvent::RoundResolved {
                        duel_id: id,
                        round_number: round.round_number,
                        challenger_score: duel.challenger_score,
                        opponent_score: duel.opponent_score,
                    }),
                };
                if let Some(event) = event {
                    state.emit(event);
                }
            }
            Err(err) => state.emit(OpsEvent::Error {
                message: format!("post-answer read of duel {} failed: {}", id, err),
            }),
        }
    }

    Ok(Json(RoundView::of(&round, side)))
}

async fn get_duel(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<DuelId>,
) -> Result<Json<DuelView>, ApiError> {
    let (duel, side) = state.service.get(id, user)?;
    Ok(Json(DuelView::of(&duel, side)))
}

async fn pending(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<Json<Vec<DuelView>>, ApiError> {
    let duels = state.service.pending_for(user)?;
    Ok(Json(
        duels
            .iter()
            .map(|d| DuelView::of(d, Side::Opponent))
            .collect(),
    ))
}

async fn active(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<Json<Option<DuelView>>, ApiError> {
    let duel = state.service.active_for(user)?;
    let view = duel.and_then(|duel| {
        let side = duel.side_of(user)?;
        Some(DuelView::of(&duel, side))
    });
    Ok(Json(view))
}
