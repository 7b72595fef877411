//! Read-side queries: leaderboards, progress, stats and catalogs.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::{
    db::GameDb,
    error::AppError,
    models::{
        AchievementDef, LeaderboardEntry, LeaderboardKey, MedicalCase, Period, ProgressRecord,
        Puzzle, PuzzleListing, ScoreRecord,
    },
};

/// How many puzzles each group carries when no type filter is given.
const GROUP_LIMIT: i64 = 5;

/// How many entries a leaderboard snapshot returns.
const TOP_LIMIT: i64 = 10;

/// How many recent scores ride along with a progress read.
const RECENT_SCORES: i64 = 20;

/// Top entries by score descending. Ties are unordered; no secondary key.
pub fn leaderboard_top(
    db: &GameDb,
    key: LeaderboardKey,
    period: Period,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    let conn = db.conn();
    let mut stmt = conn.prepare(
        "SELECT user_id, game_type, score, games_played, average_score
         FROM leaderboard
         WHERE game_type = ?1 AND period = ?2
         ORDER BY score DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![key.as_str(), period.as_str(), TOP_LIMIT], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, f64>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for (index, row) in rows.enumerate() {
        let (user_id, game_type, score, games_played, average_score) = row?;
        entries.push(LeaderboardEntry {
            user_id,
            game_type,
            score,
            rank: index as i64 + 1,
            games_played,
            average_score,
        });
    }

    Ok(entries)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub progress: Vec<ProgressRecord>,
    pub recent_scores: Vec<ScoreRecord>,
}

/// All progress rows for a user plus their last 20 scores.
pub fn user_progress(db: &GameDb, user_id: &str) -> Result<UserProgress, AppError> {
    let conn = db.conn();

    let progress = progress_rows(&conn, user_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, user_id, game_type, score, time_spent, difficulty, level, accuracy, completed_at
         FROM scores
         WHERE user_id = ?1
         ORDER BY completed_at DESC
         LIMIT ?2",
    )?;
    let recent_scores = stmt
        .query_map(params![user_id, RECENT_SCORES], |row| {
            ScoreRecord::try_from(row)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(UserProgress {
        progress,
        recent_scores,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_games: i64,
    pub total_score: i64,
    pub avg_score: f64,
    pub total_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub stats: StatsSummary,
    pub progress: Vec<ProgressRecord>,
    pub achievement_count: i64,
}

/// Aggregates over the user's scores plus a flattened achievement count.
pub fn user_stats(db: &GameDb, user_id: &str) -> Result<UserStats, AppError> {
    let conn = db.conn();

    let stats = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(score), 0),
                COALESCE(AVG(score), 0),
                COALESCE(SUM(time_spent), 0)
         FROM scores WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(StatsSummary {
                total_games: row.get(0)?,
                total_score: row.get(1)?,
                avg_score: row.get(2)?,
                total_time: row.get(3)?,
            })
        },
    )?;

    let progress = progress_rows(&conn, user_id)?;
    let achievement_count = progress
        .iter()
        .map(|record| record.achievements.len() as i64)
        .sum();

    Ok(UserStats {
        stats,
        progress,
        achievement_count,
    })
}

fn progress_rows(conn: &Connection, user_id: &str) -> Result<Vec<ProgressRecord>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, game_type, current_level, max_level, total_xp,
                achievements, unlocked_items, daily_streak, last_played_at, updated_at
         FROM progress
         WHERE user_id = ?1
         ORDER BY game_type",
    )?;
    let rows = stmt
        .query_map([user_id], |row| ProgressRecord::try_from(row))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Full achievement catalog, ordered by category then reward.
pub fn achievement_catalog(db: &GameDb) -> Result<Vec<AchievementDef>, AppError> {
    let conn = db.conn();
    let mut stmt = conn.prepare(
        "SELECT name, category, xp_reward FROM achievement_defs
         ORDER BY category, xp_reward",
    )?;
    let defs = stmt
        .query_map([], |row| {
            Ok(AchievementDef {
                name: row.get(0)?,
                category: row.get(1)?,
                xp_reward: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(defs)
}

/// Puzzle listing: everything of one type when filtered, otherwise the four
/// fixed groups capped at five puzzles each.
pub fn list_puzzles(db: &GameDb, puzzle_type: Option<&str>) -> Result<PuzzleListing, AppError> {
    let conn = db.conn();

    match puzzle_type {
        // LIMIT -1 is SQLite for "no limit".
        Some(kind) => Ok(PuzzleListing::Filtered {
            puzzles: puzzles_of_type(&conn, kind, -1)?,
        }),
        None => Ok(PuzzleListing::Grouped {
            anatomy: puzzles_of_type(&conn, "anatomy", GROUP_LIMIT)?,
            medicine: puzzles_of_type(&conn, "medicine", GROUP_LIMIT)?,
            emergency: puzzles_of_type(&conn, "emergency", GROUP_LIMIT)?,
            chemistry: puzzles_of_type(&conn, "chemistry", GROUP_LIMIT)?,
        }),
    }
}

fn puzzles_of_type(conn: &Connection, kind: &str, limit: i64) -> Result<Vec<Puzzle>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, puzzle_type, title, difficulty, data FROM puzzles
         WHERE puzzle_type = ?1
         ORDER BY id
         LIMIT ?2",
    )?;
    let puzzles = stmt
        .query_map(params![kind, limit], |row| {
            let raw: String = row.get(4)?;
            let data = serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            Ok(Puzzle {
                id: row.get(0)?,
                puzzle_type: row.get(1)?,
                title: row.get(2)?,
                difficulty: row.get(3)?,
                data,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(puzzles)
}

/// Active clinical cases, optionally filtered by difficulty and category.
pub fn list_cases(
    db: &GameDb,
    difficulty: Option<&str>,
    category: Option<&str>,
) -> Result<Vec<MedicalCase>, AppError> {
    let mut sql = String::from(
        "SELECT id, title, category, difficulty, data FROM medical_cases WHERE active = 1",
    );
    let mut binds: Vec<String> = Vec::new();

    if let Some(difficulty) = difficulty {
        binds.push(difficulty.to_string());
        sql.push_str(&format!(" AND difficulty = ?{}", binds.len()));
    }
    if let Some(category) = category {
        binds.push(category.to_string());
        sql.push_str(&format!(" AND category = ?{}", binds.len()));
    }
    sql.push_str(" ORDER BY id");

    let conn = db.conn();
    let mut stmt = conn.prepare(&sql)?;
    let cases = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), |row| {
            let raw: String = row.get(4)?;
            let data = serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            Ok(MedicalCase {
                id: row.get(0)?,
                title: row.get(1)?,
                category: row.get(2)?,
                difficulty: row.get(3)?,
                data,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cases)
}
