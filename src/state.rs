use std::{path::Path, sync::Arc};

use crate::{config::Config, db::GameDb};

pub struct State {
    pub config: Config,
    pub db: GameDb,
}

impl State {
    pub fn new() -> Arc<Self> {
        let config = Config::load();

        let db = GameDb::open(Path::new(&config.db_path)).expect("Failed to open game database");

        Arc::new(Self { config, db })
    }
}
