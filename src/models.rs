//! Domain types and wire payloads.
//!
//! Everything serialized to the frontend is camelCase; database rows use the
//! snake_case column names from the schema in [`crate::db`].

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current timestamp in milliseconds, the unit every table stores.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Games playable on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    MedicamentMatch,
    UrgenceChrono,
    Anatomy,
    ChimieLab,
    CasClinique,
}

impl GameType {
    pub const ALL: [GameType; 5] = [
        Self::MedicamentMatch,
        Self::UrgenceChrono,
        Self::Anatomy,
        Self::ChimieLab,
        Self::CasClinique,
    ];

    /// String ID for database storage and query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicamentMatch => "medicament_match",
            Self::UrgenceChrono => "urgence_chrono",
            Self::Anatomy => "anatomy",
            Self::ChimieLab => "chimie_lab",
            Self::CasClinique => "cas_clinique",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "medicament_match" => Some(Self::MedicamentMatch),
            "urgence_chrono" => Some(Self::UrgenceChrono),
            "anatomy" => Some(Self::Anatomy),
            "chimie_lab" => Some(Self::ChimieLab),
            "cas_clinique" => Some(Self::CasClinique),
            _ => None,
        }
    }
}

/// Leaderboard partitioning key. Labels only: nothing windows or resets the
/// daily/weekly/monthly rows at calendar boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Alltime,
}

impl Period {
    pub const ALL: [Period; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Alltime];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Alltime => "alltime",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "alltime" => Some(Self::Alltime),
            _ => None,
        }
    }
}

/// What a leaderboard row is keyed by: a real game, or the synthetic
/// `overall` aggregate across all games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardKey {
    Overall,
    Game(GameType),
}

pub const OVERALL_KEY: &str = "overall";

impl LeaderboardKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overall => OVERALL_KEY,
            Self::Game(game) => game.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        if s == OVERALL_KEY {
            Some(Self::Overall)
        } else {
            GameType::from_str(s).map(Self::Game)
        }
    }
}

/// A game-score submission as received from the client.
///
/// Every field is optional at the wire level; [`crate::games::submit_score`]
/// decides what is required and what gets a default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub game_type: Option<String>,
    pub score: Option<i64>,
    pub time_spent: Option<i64>,
    pub difficulty: Option<String>,
    pub level: Option<i64>,
    pub accuracy: Option<f64>,
}

/// One immutable row per played game session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: i64,
    pub user_id: String,
    pub game_type: GameType,
    pub score: i64,
    pub time_spent: i64,
    pub difficulty: String,
    pub level: i64,
    pub accuracy: Option<f64>,
    pub completed_at: i64,
}

impl TryFrom<&rusqlite::Row<'_>> for ScoreRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let raw: String = row.get("game_type")?;
        let game_type = GameType::from_str(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown game type: {raw}").into(),
            )
        })?;

        Ok(Self {
            game_type,

            id: row.get("id")?,
            user_id: row.get("user_id")?,
            score: row.get("score")?,
            time_spent: row.get("time_spent")?,
            difficulty: row.get("difficulty")?,
            level: row.get("level")?,
            accuracy: row.get("accuracy")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Running summary for one (user, game) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,
    pub game_type: GameType,
    pub current_level: i64,
    pub max_level: i64,
    pub total_xp: i64,
    /// Earned achievement names, duplicates kept.
    pub achievements: Vec<String>,
    pub unlocked_items: Vec<String>,
    pub daily_streak: i64,
    pub last_played_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&rusqlite::Row<'_>> for ProgressRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let raw_type: String = row.get("game_type")?;
        let game_type = GameType::from_str(&raw_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown game type: {raw_type}").into(),
            )
        })?;

        let achievements = json_list(row, "achievements")?;
        let unlocked_items = json_list(row, "unlocked_items")?;

        Ok(Self {
            game_type,
            achievements,
            unlocked_items,

            user_id: row.get("user_id")?,
            current_level: row.get("current_level")?,
            max_level: row.get("max_level")?,
            total_xp: row.get("total_xp")?,
            daily_streak: row.get("daily_streak")?,
            last_played_at: row.get("last_played_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn json_list(row: &rusqlite::Row, column: &str) -> Result<Vec<String>, rusqlite::Error> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// One ranked leaderboard row as served to clients.
///
/// `game_type` stays a plain string because the synthetic `overall` key is
/// not a [`GameType`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub game_type: String,
    pub score: i64,
    pub rank: i64,
    pub games_played: i64,
    pub average_score: f64,
}

/// Static catalog entry; read-only from this pipeline's perspective.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
    pub name: String,
    pub category: String,
    pub xp_reward: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub id: i64,
    pub puzzle_type: String,
    pub title: String,
    pub difficulty: String,
    pub data: serde_json::Value,
}

/// Puzzle listing response. Tagged so callers never have to type-sniff the
/// grouped and filtered shapes apart.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PuzzleListing {
    Filtered {
        puzzles: Vec<Puzzle>,
    },
    Grouped {
        anatomy: Vec<Puzzle>,
        medicine: Vec<Puzzle>,
        emergency: Vec<Puzzle>,
        chemistry: Vec<Puzzle>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCase {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub difficulty: String,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_ids_round_trip() {
        for game in GameType::ALL {
            assert_eq!(GameType::from_str(game.as_str()), Some(game));
        }
        assert_eq!(GameType::from_str("tetris"), None);
    }

    #[test]
    fn test_leaderboard_key_covers_every_game_and_overall() {
        assert_eq!(
            LeaderboardKey::from_str(OVERALL_KEY),
            Some(LeaderboardKey::Overall)
        );
        for game in GameType::ALL {
            assert_eq!(
                LeaderboardKey::from_str(game.as_str()),
                Some(LeaderboardKey::Game(game))
            );
        }
    }
}
