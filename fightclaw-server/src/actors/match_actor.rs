use std::collections::HashMap;
use std::time::Duration as StdDuration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use fightclaw_engine::{self as engine, ApplyError, GameState, Move};

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::{leaderboard, match_actor_state, match_event, match_player, match_result, match_row};
use crate::services::elo;
use crate::services::idempotency::{CachedResponse, IdempotencyCache};
use crate::services::sse::ServerEvent;
use crate::actors::matchmaker_actor::MatchmakerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Ended,
}

/// Authoritative per-match state, owned exclusively by its MatchActor (spec
/// §3 `MatchState`). Also the wire shape returned by `/state` and embedded
/// in `state` SSE frames, and the JSON blob persisted into
/// `match_actor_state` for durability (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub state_version: u64,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub turn_expires_at_ms: Option<i64>,
    pub players: [Uuid; 2],
    pub game: GameState,
    pub last_move: Option<Move>,
    pub winner_agent_id: Option<Uuid>,
    pub loser_agent_id: Option<Uuid>,
}

pub struct MoveResult {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

pub enum Command {
    Init {
        players: [Uuid; 2],
        seed: Option<u64>,
        mode: String,
        starting_ratings: [i32; 2],
        prompt_version_ids: [Option<String>; 2],
        reply: oneshot::Sender<Result<MatchState, AppError>>,
    },
    Move {
        agent_id: Uuid,
        move_id: Uuid,
        expected_version: u64,
        mv: Move,
        reply: oneshot::Sender<MoveResult>,
    },
    Finish {
        agent_id: Uuid,
        reason: Option<String>,
        reply: oneshot::Sender<Result<MatchState, AppError>>,
    },
    State {
        reply: oneshot::Sender<Option<MatchState>>,
    },
    Stream {
        agent_id: Uuid,
        reply: oneshot::Sender<Result<(Option<MatchState>, mpsc::Receiver<ServerEvent>), AppError>>,
    },
    Spectate {
        reply: oneshot::Sender<(Option<MatchState>, mpsc::Receiver<ServerEvent>)>,
    },
    Wake,
}

#[derive(Clone)]
pub struct MatchHandle {
    tx: mpsc::Sender<Command>,
}

impl MatchHandle {
    pub async fn init(
        &self,
        players: [Uuid; 2],
        seed: Option<u64>,
        mode: String,
        starting_ratings: [i32; 2],
        prompt_version_ids: [Option<String>; 2],
    ) -> Result<MatchState, AppError> {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::Init { players, seed, mode, starting_ratings, prompt_version_ids, reply })
            .await;
        rx.await.map_err(|_| AppError::ServiceUnavailable("match actor unavailable".into()))?
    }

    pub async fn submit_move(&self, agent_id: Uuid, move_id: Uuid, expected_version: u64, mv: Move) -> MoveResult {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Move { agent_id, move_id, expected_version, mv, reply }).await;
        rx.await.unwrap_or(MoveResult {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: json!({"ok": false, "error": "match actor unavailable", "code": "service_unavailable"}),
        })
    }

    pub async fn finish(&self, agent_id: Uuid, reason: Option<String>) -> Result<MatchState, AppError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Finish { agent_id, reason, reply }).await;
        rx.await.map_err(|_| AppError::ServiceUnavailable("match actor unavailable".into()))?
    }

    pub async fn state(&self) -> Option<MatchState> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::State { reply }).await;
        rx.await.ok().flatten()
    }

    pub async fn stream(&self, agent_id: Uuid) -> Result<(Option<MatchState>, mpsc::Receiver<ServerEvent>), AppError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Stream { agent_id, reply }).await;
        rx.await.map_err(|_| AppError::ServiceUnavailable("match actor unavailable".into()))?
    }

    pub async fn spectate(&self) -> (Option<MatchState>, mpsc::Receiver<ServerEvent>) {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Spectate { reply }).await;
        rx.await.unwrap_or_else(|_| (None, mpsc::channel(1).1))
    }
}

/// Spawn a MatchActor task. The actor owns `state` exclusively; all requests
/// for this `matchId` are serialized through its single inbound channel
/// (spec §9 "Actor isolation").
pub fn spawn(match_id: Uuid, db: DbPool, config: Config, matchmaker: MatchmakerHandle) -> MatchHandle {
    let (tx, rx) = mpsc::channel(64);
    let idempotency_max = config.idempotency_max;
    let actor = MatchActor {
        match_id,
        db,
        config,
        matchmaker,
        state: None,
        mode: "ranked".to_string(),
        idempotency: IdempotencyCache::new(idempotency_max),
        participant_subs: HashMap::new(),
        spectator_subs: Vec::new(),
        wake_tx: tx.clone(),
        finalized: false,
    };
    tokio::spawn(actor.run(rx));
    MatchHandle { tx }
}

struct MatchActor {
    match_id: Uuid,
    db: DbPool,
    config: Config,
    matchmaker: MatchmakerHandle,
    state: Option<MatchState>,
    mode: String,
    idempotency: IdempotencyCache,
    participant_subs: HashMap<Uuid, Vec<mpsc::Sender<ServerEvent>>>,
    spectator_subs: Vec<mpsc::Sender<ServerEvent>>,
    wake_tx: mpsc::Sender<Command>,
    finalized: bool,
}

impl MatchActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        // Reconstruct durable state on (re)activation (spec §9 "Durable state").
        if let Ok(Some(blob)) = match_actor_state::load(&self.db, self.match_id).await {
            if let Ok(state) = serde_json::from_value::<MatchState>(blob) {
                if state.status == Status::Active {
                    self.arm_wake(&state);
                }
                self.state = Some(state);
            }
        }

        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Init { players, seed, mode, starting_ratings, prompt_version_ids, reply } => {
                    let result = self.handle_init(players, seed, mode, starting_ratings, prompt_version_ids).await;
                    let _ = reply.send(result);
                }
                Command::Move { agent_id, move_id, expected_version, mv, reply } => {
                    let result = self.handle_move(Utc::now(), agent_id, move_id, expected_version, mv).await;
                    let _ = reply.send(result);
                }
                Command::Finish { agent_id, reason, reply } => {
                    let result = self.handle_finish(Utc::now(), agent_id, reason).await;
                    let _ = reply.send(result);
                }
                Command::State { reply } => {
                    self.enforce_turn_timeout(Utc::now()).await;
                    let _ = reply.send(self.state.clone());
                }
                Command::Stream { agent_id, reply } => {
                    self.enforce_turn_timeout(Utc::now()).await;
                    let result = if self.is_participant(agent_id) {
                        let (tx, rx) = mpsc::channel(32);
                        self.participant_subs.entry(agent_id).or_default().push(tx);
                        Ok((self.state.clone(), rx))
                    } else {
                        Err(AppError::Forbidden("agent is not a participant of this match".into()))
                    };
                    let _ = reply.send(result);
                }
                Command::Spectate { reply } => {
                    self.enforce_turn_timeout(Utc::now()).await;
                    let (tx, rx) = mpsc::channel(32);
                    self.spectator_subs.push(tx);
                    let _ = reply.send((self.state.clone(), rx));
                }
                Command::Wake => {
                    self.enforce_turn_timeout(Utc::now()).await;
                }
            }
        }
    }

    fn is_participant(&self, agent_id: Uuid) -> bool {
        self.state.as_ref().is_some_and(|s| s.players.contains(&agent_id))
    }

    async fn handle_init(
        &mut self,
        players: [Uuid; 2],
        seed: Option<u64>,
        mode: String,
        starting_ratings: [i32; 2],
        prompt_version_ids: [Option<String>; 2],
    ) -> Result<MatchState, AppError> {
        // Idempotent: if already initialized, just enforce timeout and
        // return the (possibly forfeited) current state (spec §4.2 `init`).
        if self.state.is_some() {
            self.enforce_turn_timeout(Utc::now()).await;
            return Ok(self.state.clone().unwrap());
        }

        self.mode = mode;
        let now = Utc::now();
        let seed = seed.unwrap_or_else(|| {
            use rand::RngCore;
            rand::thread_rng().next_u64()
        });
        let game = engine::initial_state(seed, players, None);
        let turn_timeout_ms = self.config.turn_timeout.as_millis() as i64;
        let state = MatchState {
            state_version: 0,
            status: Status::Active,
            created_at: now,
            updated_at: now,
            ended_at: None,
            turn_expires_at_ms: Some(now.timestamp_millis() + turn_timeout_ms),
            players,
            game,
            last_move: None,
            winner_agent_id: None,
            loser_agent_id: None,
        };

        // These two writes establish the match's durable identity; a failure
        // here means the match cannot exist and the caller (MatchmakerActor)
        // must restore the partner to the queue rather than hand out a
        // matchId that will never resolve (spec §4.3 step 8).
        match_row::insert_active(&self.db, self.match_id, &self.mode)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("match init failed: {e}")))?;
        match_player::insert_players(
            &self.db,
            self.match_id,
            &[
                match_player::NewMatchPlayer {
                    agent_id: players[0],
                    seat: 0,
                    starting_rating: starting_ratings[0],
                    prompt_version_id: prompt_version_ids[0].clone(),
                },
                match_player::NewMatchPlayer {
                    agent_id: players[1],
                    seat: 1,
                    starting_rating: starting_ratings[1],
                    prompt_version_id: prompt_version_ids[1].clone(),
                },
            ],
        )
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("match init failed: {e}")))?;
        let _ = match_event::append(
            &self.db,
            self.match_id,
            0,
            "match_started",
            &json!({"players": players, "seed": seed}),
        )
        .await;

        self.persist(&state).await;
        self.arm_wake(&state);

        self.broadcast(ServerEvent::State { match_id: self.match_id, state: state.clone() }).await;
        let active_agent = engine::current_player(&state.game);
        self.send_to_agent(
            active_agent,
            ServerEvent::YourTurn { match_id: self.match_id, state_version: state.state_version },
        )
        .await;

        self.state = Some(state.clone());
        Ok(state)
    }

    async fn handle_move(
        &mut self,
        now: DateTime<Utc>,
        agent_id: Uuid,
        move_id: Uuid,
        expected_version: u64,
        mv: Move,
    ) -> MoveResult {
        if let Some(cached) = self.idempotency.get(move_id) {
            return MoveResult {
                status: StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK),
                body: cached.body,
            };
        }

        let version_before = self.state.as_ref().map(|s| s.state_version).unwrap_or(0);

        // Step 2: no state.
        if self.state.is_none() {
            return self.cache_and_return(move_id, version_before, StatusCode::CONFLICT, error_body(&AppError::MatchNotInitialized));
        }

        // Step 3: opportunistic turn-timeout enforcement.
        self.enforce_turn_timeout(now).await;

        let (status, game, players) = {
            let state = self.state.as_ref().unwrap();
            (state.status, state.game.clone(), state.players)
        };

        // Step 4: already ended.
        if status == Status::Ended {
            let current_version = self.state.as_ref().unwrap().state_version;
            return self.cache_and_return(move_id, version_before, StatusCode::CONFLICT, ended_body(current_version));
        }

        // Step 5: version mismatch.
        let current_version = self.state.as_ref().unwrap().state_version;
        if expected_version != current_version {
            return self.cache_and_return(
                move_id,
                version_before,
                StatusCode::CONFLICT,
                version_mismatch_body(current_version),
            );
        }

        // Step 6: engine schema validation — forfeits the submitter.
        if engine::validate_schema(&game, &mv).is_err() {
            let (status, body) = self.forfeit(now, agent_id, "invalid_move_schema").await;
            return self.cache_and_return(move_id, version_before, status, body);
        }

        // Step 7: agentId must be a participant.
        if agent_id != players[0] && agent_id != players[1] {
            return self.cache_and_return(
                move_id,
                version_before,
                StatusCode::FORBIDDEN,
                error_body(&AppError::Forbidden("agent is not a participant of this match".into())),
            );
        }

        // Step 8: must be this agent's turn.
        if engine::current_player(&game) != agent_id {
            return self.cache_and_return(move_id, version_before, StatusCode::CONFLICT, error_body(&AppError::NotYourTurn));
        }

        // Step 9: move must be presently legal.
        let legal = engine::list_legal_moves(&game);
        if !legal.contains(&mv) {
            let (status, body) = self.forfeit(now, agent_id, "illegal_move").await;
            return self.cache_and_return(move_id, version_before, status, body);
        }

        // Step 10/11: apply.
        match engine::apply_move(&game, &mv) {
            Err(ApplyError::Terminal) => {
                let current_version = self.state.as_ref().unwrap().state_version;
                self.cache_and_return(move_id, version_before, StatusCode::CONFLICT, ended_body(current_version))
            }
            Err(_) => {
                let (status, body) = self.forfeit(now, agent_id, "invalid_move").await;
                self.cache_and_return(move_id, version_before, status, body)
            }
            Ok((next_game, engine_events)) => {
                let (status, body) = self.apply_success(now, agent_id, move_id, mv, next_game, engine_events).await;
                self.cache_and_return(move_id, version_before, status, body)
            }
        }
    }

    async fn apply_success(
        &mut self,
        now: DateTime<Utc>,
        agent_id: Uuid,
        move_id: Uuid,
        mv: Move,
        next_game: GameState,
        engine_events: Vec<fightclaw_engine::EngineEvent>,
    ) -> (StatusCode, serde_json::Value) {
        let terminal = engine::is_terminal(&next_game);
        let mut state = self.state.take().unwrap();
        state.state_version += 1;
        state.updated_at = now;
        state.last_move = Some(mv.clone());
        let active_changed = engine::current_player(&state.game) != engine::current_player(&next_game);
        state.game = next_game;

        if let fightclaw_engine::Terminal::Ended { winner, .. } = terminal {
            // `state.game.terminal_reason` (set by the engine itself) is the
            // source of truth for `reason`/`reasonCode`; no need to carry it separately.
            state.status = Status::Ended;
            state.ended_at = Some(now);
            state.turn_expires_at_ms = None;
            state.winner_agent_id = winner;
            state.loser_agent_id = winner.map(|w| if w == state.players[0] { state.players[1] } else { state.players[0] });
        } else if active_changed {
            state.turn_expires_at_ms = Some(now.timestamp_millis() + self.config.turn_timeout.as_millis() as i64);
        }

        self.persist(&state).await;

        let _ = match_event::append(
            &self.db,
            self.match_id,
            state.game.turn_number as i64,
            "move_applied",
            &json!({
                "agentId": agent_id,
                "moveId": move_id,
                "move": state.last_move,
                "stateVersion": state.state_version,
                "engineEvents": engine_events,
                "ts": now,
            }),
        )
        .await;

        self.broadcast(ServerEvent::State { match_id: self.match_id, state: state.clone() }).await;
        self.broadcast(ServerEvent::EngineEvents {
            match_id: self.match_id,
            state_version: state.state_version,
            agent_id,
            move_id,
            mv,
            engine_events,
            ts: now,
        })
        .await;

        if state.status == Status::Ended {
            let reason = state.game.terminal_reason.clone().unwrap_or_else(|| "unknown".to_string());
            self.broadcast(ServerEvent::MatchEnded {
                match_id: self.match_id,
                winner_agent_id: state.winner_agent_id,
                loser_agent_id: state.loser_agent_id,
                reason: reason.clone(),
                reason_code: reason,
            })
            .await;
            self.arm_wake_cancel();
            self.finalize(&state).await;
        } else {
            let next_agent = engine::current_player(&state.game);
            self.send_to_agent(
                next_agent,
                ServerEvent::YourTurn { match_id: self.match_id, state_version: state.state_version },
            )
            .await;
            self.arm_wake(&state);
        }

        let body = json!({"ok": true, "state": state});
        self.state = Some(state);
        (StatusCode::OK, body)
    }

    async fn handle_finish(&mut self, now: DateTime<Utc>, agent_id: Uuid, reason: Option<String>) -> Result<MatchState, AppError> {
        self.enforce_turn_timeout(now).await;

        let Some(state) = self.state.clone() else {
            return Err(AppError::MatchNotInitialized);
        };
        if state.status == Status::Ended {
            return Ok(state);
        }
        if agent_id != state.players[0] && agent_id != state.players[1] {
            return Err(AppError::Forbidden("agent is not a participant of this match".into()));
        }
        let _ = reason;
        self.forfeit(now, agent_id, "forfeit").await;
        Ok(self.state.clone().unwrap())
    }

    /// Shared forfeit path used by schema/illegal/invalid-move failures,
    /// turn-timeout, and explicit `/finish` (spec §4.2 steps 6/9/10, §4.2
    /// "Turn-timeout enforcement", §4.2 `finish`).
    async fn forfeit(&mut self, now: DateTime<Utc>, forfeiting_agent: Uuid, reason_code: &str) -> (StatusCode, serde_json::Value) {
        let mut state = self.state.take().unwrap();
        let winner = if forfeiting_agent == state.players[0] { state.players[1] } else { state.players[0] };

        state.state_version += 1;
        state.status = Status::Ended;
        state.updated_at = now;
        state.ended_at = Some(now);
        state.turn_expires_at_ms = None;
        state.winner_agent_id = Some(winner);
        state.loser_agent_id = Some(forfeiting_agent);
        state.game.winner = Some(if winner == state.game.players[0] {
            fightclaw_engine::Side::A
        } else {
            fightclaw_engine::Side::B
        });
        state.game.terminal_reason = Some(reason_code.to_string());

        self.persist(&state).await;

        let _ = match_event::append(
            &self.db,
            self.match_id,
            state.game.turn_number as i64,
            "match_ended",
            &json!({"winnerAgentId": winner, "loserAgentId": forfeiting_agent, "reason": reason_code}),
        )
        .await;

        self.broadcast(ServerEvent::MatchEnded {
            match_id: self.match_id,
            winner_agent_id: Some(winner),
            loser_agent_id: Some(forfeiting_agent),
            reason: reason_code.to_string(),
            reason_code: reason_code.to_string(),
        })
        .await;

        self.arm_wake_cancel();
        self.finalize(&state).await;

        let body = json!({
            "ok": false,
            "forfeited": true,
            "matchStatus": "ended",
            "winnerAgentId": winner,
            "reasonCode": reason_code,
        });
        self.state = Some(state);
        (StatusCode::BAD_REQUEST, body)
    }

    /// Turn-timeout enforcement shared by the scheduled wake and every
    /// opportunistic read/write (spec §4.2, §9 "Turn-timeout scheduler").
    async fn enforce_turn_timeout(&mut self, now: DateTime<Utc>) {
        let Some(state) = self.state.as_ref() else { return };
        if state.status != Status::Active {
            return;
        }

        if state.turn_expires_at_ms.is_none() {
            let deadline = state.updated_at.timestamp_millis() + self.config.turn_timeout.as_millis() as i64;
            let mut state = self.state.take().unwrap();
            state.turn_expires_at_ms = Some(deadline);
            self.persist(&state).await;
            self.arm_wake(&state);
            self.state = Some(state);
            return;
        }

        let deadline = state.turn_expires_at_ms.unwrap();
        if now.timestamp_millis() >= deadline {
            let active_agent = engine::current_player(&state.game);
            self.forfeit(now, active_agent, "turn_timeout").await;
        }
    }

    /// Runs once per match, on any transition to `ended` (spec §4.2
    /// "Finalization"). In production the persistence work is offloaded to a
    /// detached background task so a slow leaderboard write never holds up
    /// the actor's next command; under `TEST_MODE` it runs inline so tests
    /// observe the finished leaderboard/match_results rows deterministically
    /// (spec §4.2 "Finalization persistence runs inside a scoped background
    /// task in production, and synchronously under TEST_MODE").
    async fn finalize(&mut self, state: &MatchState) {
        if self.finalized {
            self.matchmaker.featured_ended(self.match_id).await;
            return;
        }
        self.finalized = true;

        let db = self.db.clone();
        let match_id = self.match_id;
        let matchmaker = self.matchmaker.clone();
        let state = state.clone();

        if self.config.test_mode {
            Self::run_finalization(db, match_id, matchmaker, state).await;
        } else {
            tokio::spawn(Self::run_finalization(db, match_id, matchmaker, state));
        }
    }

    async fn run_finalization(db: DbPool, match_id: Uuid, matchmaker: MatchmakerHandle, state: MatchState) {
        if match_result::exists(&db, match_id).await.unwrap_or(false) {
            matchmaker.featured_ended(match_id).await;
            return;
        }

        let final_version = state.state_version as i64;
        let reason = state
            .game
            .terminal_reason
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let inserted = match_result::insert_ignore(
            &db,
            match_id,
            state.winner_agent_id,
            state.loser_agent_id,
            &reason,
        )
        .await
        .unwrap_or(false);

        let _ = match_row::update_ended(
            &db,
            match_id,
            state.winner_agent_id,
            &reason,
            final_version,
        )
        .await;

        if inserted {
            if let (Some(winner), Some(loser)) = (state.winner_agent_id, state.loser_agent_id) {
                let _ = leaderboard::upsert_start(&db, winner).await;
                let _ = leaderboard::upsert_start(&db, loser).await;
                if let (Ok(winner_rating), Ok(loser_rating)) = (
                    leaderboard::rating_of(&db, winner).await,
                    leaderboard::rating_of(&db, loser).await,
                ) {
                    let new_winner = elo::updated_rating(winner_rating, loser_rating, 1.0);
                    let new_loser = elo::updated_rating(loser_rating, winner_rating, 0.0);
                    let _ = leaderboard::apply_rating_delta(&db, winner, new_winner, 1, 0).await;
                    let _ = leaderboard::apply_rating_delta(&db, loser, new_loser, 0, 1).await;
                }
            }
        }

        matchmaker.featured_ended(match_id).await;
    }

    fn cache_and_return(&mut self, move_id: Uuid, version_before: u64, status: StatusCode, body: serde_json::Value) -> MoveResult {
        self.idempotency.insert(
            move_id,
            CachedResponse { status: status.as_u16(), body: body.clone(), state_version_at_time: version_before },
            version_before,
        );
        MoveResult { status, body }
    }

    async fn persist(&self, state: &MatchState) {
        if let Ok(blob) = serde_json::to_value(state) {
            let _ = match_actor_state::save(&self.db, self.match_id, &blob).await;
        }
    }

    fn arm_wake(&self, state: &MatchState) {
        let Some(deadline_ms) = state.turn_expires_at_ms else { return };
        let now_ms = Utc::now().timestamp_millis();
        let delay = (deadline_ms - now_ms).max(0) as u64;
        let tx = self.wake_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(delay)).await;
            let _ = tx.send(Command::Wake).await;
        });
    }

    /// No in-process cancellation handle is kept for the sleep task; a wake
    /// firing after the match already ended is a harmless no-op because
    /// `enforce_turn_timeout` only acts when `status == Active`.
    fn arm_wake_cancel(&self) {}

    async fn broadcast(&mut self, event: ServerEvent) {
        let timeout = self.config.sse_write_timeout;
        let mut dead = Vec::new();
        for (i, sub) in self.spectator_subs.iter().enumerate() {
            if tokio::time::timeout(timeout, sub.send(event.clone())).await.is_err() {
                dead.push(i);
            }
        }
        for i in dead.into_iter().rev() {
            self.spectator_subs.remove(i);
        }

        let mut empty_agents = Vec::new();
        for (agent_id, subs) in self.participant_subs.iter_mut() {
            let mut dead = Vec::new();
            for (i, sub) in subs.iter().enumerate() {
                if tokio::time::timeout(timeout, sub.send(event.clone())).await.is_err() {
                    dead.push(i);
                }
            }
            for i in dead.into_iter().rev() {
                subs.remove(i);
            }
            if subs.is_empty() {
                empty_agents.push(*agent_id);
            }
        }
        for agent_id in empty_agents {
            self.participant_subs.remove(&agent_id);
        }
    }

    async fn send_to_agent(&mut self, agent_id: Uuid, event: ServerEvent) {
        let timeout = self.config.sse_write_timeout;
        let Some(subs) = self.participant_subs.get_mut(&agent_id) else { return };
        let mut dead = Vec::new();
        for (i, sub) in subs.iter().enumerate() {
            if tokio::time::timeout(timeout, sub.send(event.clone())).await.is_err() {
                dead.push(i);
            }
        }
        for i in dead.into_iter().rev() {
            subs.remove(i);
        }
        if subs.is_empty() {
            self.participant_subs.remove(&agent_id);
        }
    }
}

fn error_body(err: &AppError) -> serde_json::Value {
    json!({"ok": false, "error": err.code().replace('_', " "), "code": err.code()})
}

fn ended_body(current_version: u64) -> serde_json::Value {
    json!({"ok": false, "error": "match ended", "code": "match_ended", "stateVersion": current_version})
}

fn version_mismatch_body(current_version: u64) -> serde_json::Value {
    json!({"ok": false, "error": "version mismatch", "code": "version_mismatch", "stateVersion": current_version})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&Status::Ended).unwrap(), "\"ended\"");
    }
}
