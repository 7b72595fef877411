//! Per-(user, game) progress summary.
//!
//! Experience is `floor(score / 10)` per submission and only ever grows.
//! The daily streak is initialised to 1 on first play; nothing in this
//! pipeline increments or resets it afterwards.

use rusqlite::{Connection, OptionalExtension, params};

use crate::{error::AppError, models::GameType};

/// Fold one submission into the progress row, creating it on first play.
/// Runs inside the submission transaction.
pub fn apply(
    conn: &Connection,
    user_id: &str,
    game_type: GameType,
    score: i64,
    level: Option<i64>,
    now: i64,
) -> Result<(), AppError> {
    let existing = conn
        .query_row(
            "SELECT current_level, max_level, total_xp FROM progress
             WHERE user_id = ?1 AND game_type = ?2",
            params![user_id, game_type.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    let xp_gain = score / 10;

    match existing {
        Some((current_level, max_level, total_xp)) => {
            let new_current = level.unwrap_or(current_level);
            let new_max = max_level.max(level.unwrap_or(1));

            conn.execute(
                "UPDATE progress
                 SET current_level = ?3, max_level = ?4, total_xp = ?5,
                     last_played_at = ?6, updated_at = ?6
                 WHERE user_id = ?1 AND game_type = ?2",
                params![
                    user_id,
                    game_type.as_str(),
                    new_current,
                    new_max,
                    total_xp + xp_gain,
                    now,
                ],
            )?;
        }
        None => {
            let start_level = level.unwrap_or(1);

            conn.execute(
                "INSERT INTO progress
                 (user_id, game_type, current_level, max_level, total_xp,
                  achievements, unlocked_items, daily_streak, last_played_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3, ?4, '[]', '[]', 1, ?5, ?5)",
                params![user_id, game_type.as_str(), start_level, xp_gain, now],
            )?;
        }
    }

    Ok(())
}
