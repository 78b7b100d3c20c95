pub mod actors;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod models;
pub mod request_id;
pub mod routes;
pub mod services;

use actors::matchmaker_actor::MatchmakerHandle;
use actors::registry::MatchRegistry;
use config::Config;
use db::DbPool;

/// Shared application state handed to every route (spec §9 "Actor
/// isolation" — the transport shell holds only handles into the actor
/// runtime, never match state itself).
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub registry: MatchRegistry,
    pub matchmaker: MatchmakerHandle,
}

/// Wires the MatchmakerActor singleton and its MatchRegistry together, then
/// builds the router (spec §2 data flow: transport → MatchmakerActor /
/// MatchActor).
pub async fn build_router(db: DbPool, config: Config) -> axum::Router {
    let matchmaker = actors::matchmaker_actor::spawn(db.clone(), config.clone());
    let registry = MatchRegistry::new(db.clone(), config.clone(), matchmaker.clone());
    matchmaker.attach_registry(registry.clone()).await;

    let state = AppState { db, config, registry, matchmaker };

    routes::router(state)
}
