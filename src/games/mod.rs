//! Score pipeline: ingestion, progress, leaderboards, achievements.
//!
//! [`submit_score`] is the single write path. Everything it touches happens
//! inside one transaction, so a client that gets a 200 knows the score, the
//! progress update, the leaderboard rows and any earned achievements all
//! landed together.

pub mod achievements;
pub mod leaderboard;
pub mod progress;
pub mod queries;

use rusqlite::params;
use serde::Serialize;
use tracing::info;

use crate::{
    db::GameDb,
    error::AppError,
    models::{AchievementDef, GameType, ScoreRecord, ScoreSubmission, now_ms},
};

/// What a successful submission returns to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOutcome {
    pub score: ScoreRecord,
    pub new_achievements: Vec<AchievementDef>,
}

/// Validate and persist a submission, then run the downstream updates.
pub fn submit_score(
    db: &GameDb,
    user_id: &str,
    submission: ScoreSubmission,
) -> Result<ScoreOutcome, AppError> {
    let game_type = submission
        .game_type
        .as_deref()
        .and_then(GameType::from_str)
        .ok_or(AppError::Validation("gameType"))?;
    // Zero is a real score; negatives would drain total_xp and the
    // leaderboard counters, which only ever accumulate.
    let score = submission
        .score
        .filter(|&s| s >= 0)
        .ok_or(AppError::Validation("score"))?;
    // A zero timeSpent is treated as missing; frontend contract since the
    // first release, and clients now rely on the 400.
    let time_spent = submission
        .time_spent
        .filter(|&t| t != 0)
        .ok_or(AppError::Validation("timeSpent"))?;

    let difficulty = submission.difficulty.unwrap_or_else(|| "facile".to_string());
    let level = submission.level.unwrap_or(1);
    let now = now_ms();

    let mut conn = db.conn();
    let tx = conn.transaction()?;

    tx.execute(
        r#"INSERT INTO scores
           (user_id, game_type, score, time_spent, difficulty, level, accuracy, completed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![
            user_id,
            game_type.as_str(),
            score,
            time_spent,
            difficulty,
            level,
            submission.accuracy,
            now,
        ],
    )?;
    let score_id = tx.last_insert_rowid();

    progress::apply(&tx, user_id, game_type, score, submission.level, now)?;
    leaderboard::apply(&tx, user_id, game_type, score, now)?;

    let fired = achievements::evaluate(time_spent, score, submission.accuracy);
    let new_achievements = achievements::record(&tx, user_id, game_type, &fired, now)?;

    tx.commit()?;

    info!(
        "Recorded {} score {score} for user {user_id} ({} achievements)",
        game_type.as_str(),
        new_achievements.len()
    );

    Ok(ScoreOutcome {
        score: ScoreRecord {
            id: score_id,
            user_id: user_id.to_string(),
            game_type,
            score,
            time_spent,
            difficulty,
            level,
            accuracy: submission.accuracy,
            completed_at: now,
        },
        new_achievements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    fn submission(score: i64, time_spent: i64, accuracy: Option<f64>) -> ScoreSubmission {
        ScoreSubmission {
            game_type: Some("medicament_match".to_string()),
            score: Some(score),
            time_spent: Some(time_spent),
            accuracy,
            ..Default::default()
        }
    }

    fn progress_row(db: &GameDb, user: &str) -> (i64, i64, i64, Vec<String>) {
        let conn = db.conn();
        conn.query_row(
            "SELECT current_level, max_level, total_xp, achievements
             FROM progress WHERE user_id = ?1 AND game_type = 'medicament_match'",
            [user],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    serde_json::from_str(&r.get::<_, String>(3)?).unwrap(),
                ))
            },
        )
        .unwrap()
    }

    #[test]
    fn test_first_submission_creates_progress() {
        let db = GameDb::open_in_memory().unwrap();

        let outcome = submit_score(&db, "u1", submission(73, 120, None)).unwrap();

        assert_eq!(outcome.score.score, 73);
        assert_eq!(outcome.score.difficulty, "facile");
        assert_eq!(outcome.score.level, 1);
        assert!(outcome.new_achievements.is_empty());

        let (current, max, xp, achievements) = progress_row(&db, "u1");
        assert_eq!(current, 1);
        assert_eq!(max, 1);
        assert_eq!(xp, 7); // floor(73 / 10)
        assert!(achievements.is_empty());
    }

    #[test]
    fn test_perfect_run_fires_all_three_rules() {
        let db = GameDb::open_in_memory().unwrap();

        let outcome = submit_score(&db, "u1", submission(100, 45, Some(98.0))).unwrap();

        let names: Vec<&str> = outcome
            .new_achievements
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, ["Éclair", "Précision Parfaite", "Perfection"]);

        let (_, max, xp, achievements) = progress_row(&db, "u1");
        assert_eq!(xp, 10);
        assert_eq!(max, 1);
        assert_eq!(achievements.len(), 3);
    }

    #[test]
    fn test_repeat_submission_accumulates_and_duplicates() {
        let db = GameDb::open_in_memory().unwrap();

        submit_score(&db, "u1", submission(100, 45, Some(98.0))).unwrap();
        submit_score(&db, "u1", submission(100, 45, Some(98.0))).unwrap();

        let (_, _, xp, achievements) = progress_row(&db, "u1");
        assert_eq!(xp, 20);

        // Achievements are appended, never deduplicated.
        let perfections = achievements.iter().filter(|n| *n == "Perfection").count();
        assert_eq!(perfections, 2);
    }

    #[test]
    fn test_submitted_level_moves_current_and_max() {
        let db = GameDb::open_in_memory().unwrap();

        let mut high = submission(50, 100, None);
        high.level = Some(4);
        submit_score(&db, "u1", high).unwrap();

        let mut low = submission(50, 100, None);
        low.level = Some(2);
        submit_score(&db, "u1", low).unwrap();

        let (current, max, _, _) = progress_row(&db, "u1");
        assert_eq!(current, 2);
        assert_eq!(max, 4);

        // Level omitted: current stays where it was.
        submit_score(&db, "u1", submission(50, 100, None)).unwrap();
        let (current, max, _, _) = progress_row(&db, "u1");
        assert_eq!(current, 2);
        assert_eq!(max, 4);
    }

    #[test]
    fn test_leaderboard_rows_per_period() {
        let db = GameDb::open_in_memory().unwrap();

        submit_score(&db, "u1", submission(80, 100, None)).unwrap();
        submit_score(&db, "u1", submission(40, 100, None)).unwrap();

        let conn = db.conn();
        for period in Period::ALL {
            let (score, played, average): (i64, i64, f64) = conn
                .query_row(
                    "SELECT score, games_played, average_score FROM leaderboard
                     WHERE user_id = 'u1' AND game_type = 'medicament_match' AND period = ?1",
                    [period.as_str()],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .unwrap();

            assert_eq!(score, 120);
            assert_eq!(played, 2);
            assert!((average - 60.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_overall_row_sums_games_but_counts_one() {
        let db = GameDb::open_in_memory().unwrap();

        submit_score(&db, "u1", submission(80, 100, None)).unwrap();

        let mut anatomy = submission(60, 100, None);
        anatomy.game_type = Some("anatomy".to_string());
        submit_score(&db, "u1", anatomy).unwrap();

        let conn = db.conn();
        let (score, played): (i64, i64) = conn
            .query_row(
                "SELECT score, games_played FROM leaderboard
                 WHERE user_id = 'u1' AND game_type = 'overall' AND period = 'alltime'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();

        assert_eq!(score, 140);
        // Overall rows never count past one game; kept pending product
        // clarification.
        assert_eq!(played, 1);
    }

    #[test]
    fn test_zero_score_is_valid() {
        let db = GameDb::open_in_memory().unwrap();

        let outcome = submit_score(&db, "u1", submission(0, 30, None)).unwrap();

        assert_eq!(outcome.score.score, 0);
        let (_, _, xp, _) = progress_row(&db, "u1");
        assert_eq!(xp, 0);
    }

    #[test]
    fn test_negative_score_is_rejected() {
        let db = GameDb::open_in_memory().unwrap();

        submit_score(&db, "u1", submission(90, 30, None)).unwrap();
        let err = submit_score(&db, "u1", submission(-50, 30, None)).unwrap_err();
        assert!(matches!(err, AppError::Validation("score")));

        // Experience never decreases.
        let (_, _, xp, _) = progress_row(&db, "u1");
        assert_eq!(xp, 9);

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM scores", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_zero_time_spent_is_rejected() {
        let db = GameDb::open_in_memory().unwrap();

        let err = submit_score(&db, "u1", submission(50, 0, None)).unwrap_err();
        assert!(matches!(err, AppError::Validation("timeSpent")));

        // Nothing persisted.
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM scores", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let db = GameDb::open_in_memory().unwrap();

        let mut missing_type = submission(50, 30, None);
        missing_type.game_type = None;
        assert!(matches!(
            submit_score(&db, "u1", missing_type).unwrap_err(),
            AppError::Validation("gameType")
        ));

        let mut unknown_type = submission(50, 30, None);
        unknown_type.game_type = Some("tetris".to_string());
        assert!(matches!(
            submit_score(&db, "u1", unknown_type).unwrap_err(),
            AppError::Validation("gameType")
        ));

        let mut missing_score = submission(50, 30, None);
        missing_score.score = None;
        assert!(matches!(
            submit_score(&db, "u1", missing_score).unwrap_err(),
            AppError::Validation("score")
        ));

        let mut missing_time = submission(50, 30, None);
        missing_time.time_spent = None;
        assert!(matches!(
            submit_score(&db, "u1", missing_time).unwrap_err(),
            AppError::Validation("timeSpent")
        ));
    }
}
