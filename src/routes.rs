//! HTTP handlers. Thin: parse the request, call into [`crate::games`],
//! serialize the result.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State as AxumState},
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    error::AppError,
    games::{
        self, ScoreOutcome,
        queries::{self, UserProgress, UserStats},
    },
    models::{
        AchievementDef, LeaderboardEntry, LeaderboardKey, MedicalCase, Period, PuzzleListing,
        ScoreSubmission,
    },
    state::State,
};

pub async fn submit_score_handler(
    AxumState(state): AxumState<Arc<State>>,
    user: AuthUser,
    Json(submission): Json<ScoreSubmission>,
) -> Result<Json<ScoreOutcome>, AppError> {
    let outcome = games::submit_score(&state.db, &user.user_id, submission)?;

    Ok(Json(outcome))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    game_type: Option<String>,
    period: Option<String>,
}

pub async fn leaderboard_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let key = match params.game_type.as_deref() {
        None => LeaderboardKey::Overall,
        Some(raw) => LeaderboardKey::from_str(raw).ok_or(AppError::Validation("gameType"))?,
    };
    let period = match params.period.as_deref() {
        None => Period::Alltime,
        Some(raw) => Period::from_str(raw).ok_or(AppError::Validation("period"))?,
    };

    Ok(Json(queries::leaderboard_top(&state.db, key, period)?))
}

pub async fn progress_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProgress>, AppError> {
    Ok(Json(queries::user_progress(&state.db, &user_id)?))
}

pub async fn stats_handler(
    AxumState(state): AxumState<Arc<State>>,
    user: AuthUser,
) -> Result<Json<UserStats>, AppError> {
    Ok(Json(queries::user_stats(&state.db, &user.user_id)?))
}

pub async fn achievements_handler(
    AxumState(state): AxumState<Arc<State>>,
) -> Result<Json<Vec<AchievementDef>>, AppError> {
    Ok(Json(queries::achievement_catalog(&state.db)?))
}

#[derive(Deserialize)]
pub struct PuzzleParams {
    #[serde(rename = "type")]
    puzzle_type: Option<String>,
}

pub async fn puzzles_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(params): Query<PuzzleParams>,
) -> Result<Json<PuzzleListing>, AppError> {
    Ok(Json(queries::list_puzzles(
        &state.db,
        params.puzzle_type.as_deref(),
    )?))
}

#[derive(Deserialize)]
pub struct CaseParams {
    difficulty: Option<String>,
    category: Option<String>,
}

pub async fn cases_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(params): Query<CaseParams>,
) -> Result<Json<Vec<MedicalCase>>, AppError> {
    Ok(Json(queries::list_cases(
        &state.db,
        params.difficulty.as_deref(),
        params.category.as_deref(),
    )?))
}
