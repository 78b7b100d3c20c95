use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::actors::match_actor::{self, MatchHandle};
use crate::actors::matchmaker_actor::MatchmakerHandle;
use crate::config::Config;
use crate::db::DbPool;

/// Sharded registry routing requests to MatchActors by `matchId` (spec §9
/// "Actor isolation"). Actors are spawned lazily on first access and kept
/// alive for the process lifetime; a fresh actor reconstructs its durable
/// state from `match_actor_state` on first command.
#[derive(Clone)]
pub struct MatchRegistry {
    shards: Arc<RwLock<HashMap<Uuid, MatchHandle>>>,
    db: DbPool,
    config: Config,
    matchmaker: MatchmakerHandle,
}

impl MatchRegistry {
    pub fn new(db: DbPool, config: Config, matchmaker: MatchmakerHandle) -> Self {
        MatchRegistry {
            shards: Arc::new(RwLock::new(HashMap::new())),
            db,
            config,
            matchmaker,
        }
    }

    pub async fn get_or_spawn(&self, match_id: Uuid) -> MatchHandle {
        {
            let shards = self.shards.read().await;
            if let Some(handle) = shards.get(&match_id) {
                return handle.clone();
            }
        }
        let mut shards = self.shards.write().await;
        shards
            .entry(match_id)
            .or_insert_with(|| {
                match_actor::spawn(match_id, self.db.clone(), self.config.clone(), self.matchmaker.clone())
            })
            .clone()
    }
}
