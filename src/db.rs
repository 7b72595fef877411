//! SQLite connection and schema management.
//!
//! One connection behind a mutex is plenty for the expected load; anything
//! that must stay consistent across statements takes a transaction on the
//! guarded connection.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

/// Shared handle to the game database.
#[derive(Clone)]
pub struct GameDb {
    conn: Arc<Mutex<Connection>>,
}

impl GameDb {
    /// Open or create the database file, apply the schema and seed the
    /// static catalogs.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::from_connection(conn)
    }

    /// In-memory database with the full schema and seed data.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute_batch(SEED_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("Game DB lock poisoned")
    }
}

/// Relational schema. Timestamps are Utc milliseconds.
const SCHEMA_SQL: &str = r#"
-- Sessions resolved by the auth extractor
CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- One immutable row per played game session
CREATE TABLE IF NOT EXISTS scores (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      TEXT NOT NULL,
    game_type    TEXT NOT NULL,
    score        INTEGER NOT NULL,
    time_spent   INTEGER NOT NULL,
    difficulty   TEXT NOT NULL DEFAULT 'facile',
    level        INTEGER NOT NULL DEFAULT 1,
    accuracy     REAL,
    completed_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scores_user ON scores(user_id, completed_at);
CREATE INDEX IF NOT EXISTS idx_scores_game ON scores(game_type);

-- Running summary per (user, game) pair
CREATE TABLE IF NOT EXISTS progress (
    user_id        TEXT NOT NULL,
    game_type      TEXT NOT NULL,
    current_level  INTEGER NOT NULL DEFAULT 1,
    max_level      INTEGER NOT NULL DEFAULT 1,
    total_xp       INTEGER NOT NULL DEFAULT 0,
    achievements   TEXT NOT NULL DEFAULT '[]',
    unlocked_items TEXT NOT NULL DEFAULT '[]',
    daily_streak   INTEGER NOT NULL DEFAULT 1,
    last_played_at INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL,
    PRIMARY KEY (user_id, game_type)
);

-- Aggregate rank rows, keyed by game type or the synthetic 'overall'
CREATE TABLE IF NOT EXISTS leaderboard (
    user_id       TEXT NOT NULL,
    game_type     TEXT NOT NULL,
    period        TEXT NOT NULL,
    score         INTEGER NOT NULL DEFAULT 0,
    games_played  INTEGER NOT NULL DEFAULT 0,
    average_score REAL NOT NULL DEFAULT 0,
    updated_at    INTEGER NOT NULL,
    PRIMARY KEY (user_id, game_type, period)
);
CREATE INDEX IF NOT EXISTS idx_leaderboard_rank ON leaderboard(game_type, period, score DESC);

-- Static achievement catalog
CREATE TABLE IF NOT EXISTS achievement_defs (
    name      TEXT PRIMARY KEY,
    category  TEXT NOT NULL,
    xp_reward INTEGER NOT NULL
);

-- Puzzle catalog
CREATE TABLE IF NOT EXISTS puzzles (
    id          INTEGER PRIMARY KEY,
    puzzle_type TEXT NOT NULL,
    title       TEXT NOT NULL,
    difficulty  TEXT NOT NULL,
    data        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_puzzles_type ON puzzles(puzzle_type);

-- Clinical case catalog
CREATE TABLE IF NOT EXISTS medical_cases (
    id         INTEGER PRIMARY KEY,
    title      TEXT NOT NULL,
    category   TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1,
    data       TEXT NOT NULL
);
"#;

/// Static catalogs: achievement definitions, puzzles and clinical cases.
/// Seeded with fixed ids so reopening an existing database is a no-op.
const SEED_SQL: &str = r#"
INSERT OR IGNORE INTO achievement_defs (name, category, xp_reward) VALUES
    ('Éclair', 'vitesse', 50),
    ('Précision Parfaite', 'precision', 75),
    ('Perfection', 'maitrise', 100),
    ('Premiers Pas', 'progression', 25),
    ('Marathon du Savoir', 'endurance', 150);

INSERT OR IGNORE INTO puzzles (id, puzzle_type, title, difficulty, data) VALUES
    (1,  'anatomy',   'Le squelette humain',          'facile',    '{"pieces":12}'),
    (2,  'anatomy',   'Les muscles du bras',          'moyen',     '{"pieces":16}'),
    (3,  'anatomy',   'Le système cardiovasculaire',  'moyen',     '{"pieces":20}'),
    (4,  'anatomy',   'Les nerfs crâniens',           'difficile', '{"pieces":24}'),
    (5,  'anatomy',   'L''appareil digestif',         'facile',    '{"pieces":14}'),
    (6,  'anatomy',   'Les os du crâne',              'difficile', '{"pieces":22}'),
    (7,  'medicine',  'Antibiotiques courants',       'facile',    '{"pairs":8}'),
    (8,  'medicine',  'Antalgiques et paliers',       'moyen',     '{"pairs":10}'),
    (9,  'medicine',  'Anticoagulants',               'difficile', '{"pairs":12}'),
    (10, 'medicine',  'Médicaments cardiologiques',   'moyen',     '{"pairs":10}'),
    (11, 'medicine',  'Psychotropes',                 'difficile', '{"pairs":12}'),
    (12, 'medicine',  'Posologies pédiatriques',      'difficile', '{"pairs":14}'),
    (13, 'emergency', 'Arrêt cardio-respiratoire',    'difficile', '{"steps":6}'),
    (14, 'emergency', 'Choc anaphylactique',          'moyen',     '{"steps":5}'),
    (15, 'emergency', 'Traumatisme crânien',          'moyen',     '{"steps":5}'),
    (16, 'emergency', 'Hémorragie digestive',         'difficile', '{"steps":6}'),
    (17, 'emergency', 'Détresse respiratoire',        'facile',    '{"steps":4}'),
    (18, 'emergency', 'AVC ischémique',               'difficile', '{"steps":7}'),
    (19, 'chemistry', 'Équilibre acido-basique',      'moyen',     '{"questions":10}'),
    (20, 'chemistry', 'Les électrolytes',             'facile',    '{"questions":8}'),
    (21, 'chemistry', 'Enzymologie',                  'difficile', '{"questions":12}'),
    (22, 'chemistry', 'Gaz du sang',                  'moyen',     '{"questions":10}'),
    (23, 'chemistry', 'Pharmacocinétique',            'difficile', '{"questions":12}'),
    (24, 'chemistry', 'Liaisons chimiques',           'facile',    '{"questions":8}');

INSERT OR IGNORE INTO medical_cases (id, title, category, difficulty, active, data) VALUES
    (1, 'Douleur thoracique aiguë',   'cardiologie', 'moyen',     1, '{"steps":4}'),
    (2, 'Céphalée brutale',           'neurologie',  'difficile', 1, '{"steps":5}'),
    (3, 'Fièvre chez le nourrisson',  'pediatrie',   'facile',    1, '{"steps":3}'),
    (4, 'Dyspnée du sujet âgé',       'pneumologie', 'moyen',     1, '{"steps":4}'),
    (5, 'Polytraumatisme routier',    'urgences',    'difficile', 1, '{"steps":6}'),
    (6, 'Crise convulsive',           'neurologie',  'facile',    0, '{"steps":3}');
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_games.db");
        let db = GameDb::open(&db_path).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"scores".to_string()));
        assert!(tables.contains(&"progress".to_string()));
        assert!(tables.contains(&"leaderboard".to_string()));
        assert!(tables.contains(&"achievement_defs".to_string()));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_games.db");

        // Open twice; catalogs must not duplicate.
        let db = GameDb::open(&db_path).unwrap();
        drop(db);
        let db = GameDb::open(&db_path).unwrap();

        let conn = db.conn();
        let puzzles: i64 = conn
            .query_row("SELECT COUNT(*) FROM puzzles", [], |r| r.get(0))
            .unwrap();
        let defs: i64 = conn
            .query_row("SELECT COUNT(*) FROM achievement_defs", [], |r| r.get(0))
            .unwrap();

        assert_eq!(puzzles, 24);
        assert_eq!(defs, 5);
    }
}
