//! Achievement rules and recording.
//!
//! Three static threshold rules, evaluated independently on every
//! submission: any subset of them can fire at once. Earned names are
//! appended to the progress row as-is; earning the same badge twice lists
//! it twice.

use rusqlite::{Connection, params};

use crate::{
    error::AppError,
    models::{AchievementDef, GameType},
};

/// A static rule checked against every submission.
#[derive(Debug)]
pub struct AchievementRule {
    pub name: &'static str,
    pub category: &'static str,
    pub xp_reward: i64,
}

pub const ECLAIR: AchievementRule = AchievementRule {
    name: "Éclair",
    category: "vitesse",
    xp_reward: 50,
};

pub const PRECISION_PARFAITE: AchievementRule = AchievementRule {
    name: "Précision Parfaite",
    category: "precision",
    xp_reward: 75,
};

pub const PERFECTION: AchievementRule = AchievementRule {
    name: "Perfection",
    category: "maitrise",
    xp_reward: 100,
};

/// Pure function of the submission: which rules fire.
pub fn evaluate(time_spent: i64, score: i64, accuracy: Option<f64>) -> Vec<&'static AchievementRule> {
    let mut fired = Vec::new();

    if time_spent < 60 && score > 80 {
        fired.push(&ECLAIR);
    }
    if accuracy.is_some_and(|a| a > 95.0) {
        fired.push(&PRECISION_PARFAITE);
    }
    if score == 100 {
        fired.push(&PERFECTION);
    }

    fired
}

/// Append the fired names to the progress row and return their catalog
/// descriptors for display. Expects the progress row to exist already
/// (ingestion runs the progress update first).
pub fn record(
    conn: &Connection,
    user_id: &str,
    game_type: GameType,
    fired: &[&'static AchievementRule],
    now: i64,
) -> Result<Vec<AchievementDef>, AppError> {
    if fired.is_empty() {
        return Ok(Vec::new());
    }

    let raw: String = conn.query_row(
        "SELECT achievements FROM progress WHERE user_id = ?1 AND game_type = ?2",
        params![user_id, game_type.as_str()],
        |row| row.get(0),
    )?;

    let mut names: Vec<String> = serde_json::from_str(&raw)?;
    names.extend(fired.iter().map(|rule| rule.name.to_string()));

    conn.execute(
        "UPDATE progress SET achievements = ?3, updated_at = ?4
         WHERE user_id = ?1 AND game_type = ?2",
        params![
            user_id,
            game_type.as_str(),
            serde_json::to_string(&names)?,
            now,
        ],
    )?;

    Ok(fired
        .iter()
        .map(|rule| AchievementDef {
            name: rule.name.to_string(),
            category: rule.category.to_string(),
            xp_reward: rule.xp_reward,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(fired: &[&'static AchievementRule]) -> Vec<&'static str> {
        fired.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_eclair_needs_speed_and_score() {
        assert_eq!(names(&evaluate(59, 81, None)), ["Éclair"]);
        assert!(evaluate(60, 81, None).is_empty());
        assert!(evaluate(59, 80, None).is_empty());
    }

    #[test]
    fn test_precision_needs_accuracy_above_95() {
        assert_eq!(names(&evaluate(120, 50, Some(95.1))), ["Précision Parfaite"]);
        assert!(evaluate(120, 50, Some(95.0)).is_empty());
        assert!(evaluate(120, 50, None).is_empty());
    }

    #[test]
    fn test_perfection_is_exact_equality() {
        assert!(names(&evaluate(300, 100, None)).contains(&"Perfection"));
        assert!(evaluate(300, 99, None).is_empty());
    }

    #[test]
    fn test_rules_fire_independently() {
        let fired = evaluate(45, 100, Some(98.0));
        assert_eq!(names(&fired), ["Éclair", "Précision Parfaite", "Perfection"]);
    }
}
