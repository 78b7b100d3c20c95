use axum::response::sse::Event;
use serde_json::json;
use uuid::Uuid;

use fightclaw_engine::{EngineEvent, Move};

use crate::actors::match_actor::MatchState;

/// SSE event taxonomy (spec §6.2). Every frame carries `eventVersion: 1`
/// and (except `no_events`) `matchId`.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    MatchFound { match_id: Uuid, opponent_id: Uuid },
    YourTurn { match_id: Uuid, state_version: u64 },
    State { match_id: Uuid, state: MatchState },
    EngineEvents {
        match_id: Uuid,
        state_version: u64,
        agent_id: Uuid,
        move_id: Uuid,
        mv: Move,
        engine_events: Vec<EngineEvent>,
        ts: chrono::DateTime<chrono::Utc>,
    },
    /// Emitted under both `match_ended` and the `game_ended` alias (spec §6.2,
    /// §9 open question) so either-named spectator matches it.
    MatchEnded {
        match_id: Uuid,
        winner_agent_id: Option<Uuid>,
        loser_agent_id: Option<Uuid>,
        reason: String,
        reason_code: String,
    },
    NoEvents,
    FeaturedChanged { match_id: Option<Uuid> },
}

impl ServerEvent {
    /// Expand into the wire frames it produces — two frames for the
    /// `match_ended`/`game_ended` alias pair, one otherwise.
    pub fn to_sse_events(&self) -> Vec<Event> {
        match self {
            ServerEvent::MatchEnded { .. } => vec![
                self.frame("match_ended"),
                self.frame("game_ended"),
            ],
            _ => vec![self.frame(self.default_name())],
        }
    }

    /// Used by the long-poll `/v1/events/wait` JSON response, which surfaces
    /// the same taxonomy as the SSE frames but as a single `{event, data}`
    /// object instead of a stream (spec §6.1 `/v1/events/wait`).
    pub fn name_and_payload(&self) -> (&'static str, serde_json::Value) {
        (self.default_name(), self.payload())
    }

    fn default_name(&self) -> &'static str {
        match self {
            ServerEvent::MatchFound { .. } => "match_found",
            ServerEvent::YourTurn { .. } => "your_turn",
            ServerEvent::State { .. } => "state",
            ServerEvent::EngineEvents { .. } => "engine_events",
            ServerEvent::MatchEnded { .. } => "match_ended",
            ServerEvent::NoEvents => "no_events",
            ServerEvent::FeaturedChanged { .. } => "featured_changed",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            ServerEvent::MatchFound { match_id, opponent_id } => json!({
                "eventVersion": 1, "matchId": match_id, "opponentId": opponent_id,
            }),
            ServerEvent::YourTurn { match_id, state_version } => json!({
                "eventVersion": 1, "matchId": match_id, "stateVersion": state_version,
            }),
            ServerEvent::State { match_id, state } => json!({
                "eventVersion": 1, "matchId": match_id, "state": state,
            }),
            ServerEvent::EngineEvents {
                match_id, state_version, agent_id, move_id, mv, engine_events, ts,
            } => json!({
                "eventVersion": 1,
                "matchId": match_id,
                "stateVersion": state_version,
                "agentId": agent_id,
                "moveId": move_id,
                "move": mv,
                "engineEvents": engine_events,
                "ts": ts,
            }),
            ServerEvent::MatchEnded { match_id, winner_agent_id, loser_agent_id, reason, reason_code } => json!({
                "eventVersion": 1,
                "matchId": match_id,
                "winnerAgentId": winner_agent_id,
                "loserAgentId": loser_agent_id,
                "reason": reason,
                "reasonCode": reason_code,
            }),
            ServerEvent::NoEvents => json!({"eventVersion": 1}),
            ServerEvent::FeaturedChanged { match_id } => json!({
                "eventVersion": 1, "matchId": match_id,
            }),
        }
    }

    fn frame(&self, name: &'static str) -> Event {
        Event::default().event(name).json_data(self.payload()).unwrap_or_else(|_| {
            Event::default().event(name).data("{}")
        })
    }
}
