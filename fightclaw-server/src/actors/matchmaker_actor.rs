use std::collections::{HashMap, VecDeque};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::actors::registry::MatchRegistry;
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{leaderboard, match_player};
use crate::services::sse::ServerEvent;

#[derive(Debug, Clone)]
pub enum JoinResult {
    Ready { match_id: Uuid, opponent_id: Uuid },
    Waiting { match_id: Uuid },
    Unavailable,
}

#[derive(Debug, Clone)]
pub enum StatusResult {
    Idle,
    Waiting { match_id: Uuid },
    Ready { match_id: Uuid, opponent_id: Uuid },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FeaturedSnapshot {
    pub match_id: Option<Uuid>,
    pub status: Option<String>,
    pub players: Option<[Uuid; 2]>,
}

struct QueueEntry {
    agent_id: Uuid,
    match_id: Uuid,
    rating: i32,
    enqueued_at: DateTime<Utc>,
}

struct ActiveMatchEntry {
    match_id: Uuid,
    opponent_id: Uuid,
}

enum Command {
    AttachRegistry(MatchRegistry),
    Join { agent_id: Uuid, reply: oneshot::Sender<JoinResult> },
    Status { agent_id: Uuid, reply: oneshot::Sender<StatusResult> },
    Leave { agent_id: Uuid, reply: oneshot::Sender<Result<(), &'static str>> },
    WaitForEvent { agent_id: Uuid, timeout_secs: u64, reply: oneshot::Sender<ServerEvent> },
    WaitTimeout { agent_id: Uuid },
    FeaturedEnded { match_id: Uuid },
    Featured { reply: oneshot::Sender<FeaturedSnapshot> },
    Live { reply: oneshot::Sender<(Option<Uuid>, Option<crate::actors::match_actor::MatchState>)> },
}

#[derive(Clone)]
pub struct MatchmakerHandle {
    tx: mpsc::Sender<Command>,
}

impl MatchmakerHandle {
    pub async fn attach_registry(&self, registry: MatchRegistry) {
        let _ = self.tx.send(Command::AttachRegistry(registry)).await;
    }

    pub async fn join(&self, agent_id: Uuid) -> JoinResult {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Join { agent_id, reply }).await;
        rx.await.unwrap_or(JoinResult::Waiting { match_id: Uuid::nil() })
    }

    pub async fn status(&self, agent_id: Uuid) -> StatusResult {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Status { agent_id, reply }).await;
        rx.await.unwrap_or(StatusResult::Idle)
    }

    pub async fn leave(&self, agent_id: Uuid) -> Result<(), &'static str> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Leave { agent_id, reply }).await;
        rx.await.unwrap_or(Ok(()))
    }

    pub async fn wait_for_event(&self, agent_id: Uuid, timeout_secs: u64) -> ServerEvent {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::WaitForEvent { agent_id, timeout_secs, reply }).await;
        rx.await.unwrap_or(ServerEvent::NoEvents)
    }

    pub async fn featured_ended(&self, match_id: Uuid) {
        let _ = self.tx.send(Command::FeaturedEnded { match_id }).await;
    }

    pub async fn featured(&self) -> FeaturedSnapshot {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Featured { reply }).await;
        rx.await.unwrap_or(FeaturedSnapshot { match_id: None, status: None, players: None })
    }

    pub async fn live(&self) -> (Option<Uuid>, Option<crate::actors::match_actor::MatchState>) {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Live { reply }).await;
        rx.await.unwrap_or((None, None))
    }
}

/// Spawn the process-wide MatchmakerActor singleton (spec §4.3, §9 "Actor
/// isolation" — same single-task-fed-by-one-channel pattern as MatchActor,
/// one instance).
pub fn spawn(db: DbPool, config: Config) -> MatchmakerHandle {
    let (tx, rx) = mpsc::channel(256);
    let actor = MatchmakerActor {
        db,
        config,
        registry: None,
        queue: VecDeque::new(),
        active: HashMap::new(),
        recent_opponent: HashMap::new(),
        event_buffers: HashMap::new(),
        waiters: HashMap::new(),
        featured: None,
        featured_queue: VecDeque::new(),
        featured_cache: None,
        self_tx: tx.clone(),
    };
    tokio::spawn(actor.run(rx));
    MatchmakerHandle { tx }
}

struct MatchmakerActor {
    db: DbPool,
    config: Config,
    registry: Option<MatchRegistry>,
    queue: VecDeque<QueueEntry>,
    active: HashMap<Uuid, ActiveMatchEntry>,
    recent_opponent: HashMap<Uuid, Uuid>,
    event_buffers: HashMap<Uuid, VecDeque<ServerEvent>>,
    waiters: HashMap<Uuid, oneshot::Sender<ServerEvent>>,
    featured: Option<Uuid>,
    featured_queue: VecDeque<Uuid>,
    featured_cache: Option<(FeaturedSnapshot, std::time::Instant)>,
    self_tx: mpsc::Sender<Command>,
}

impl MatchmakerActor {
    fn registry(&self) -> &MatchRegistry {
        self.registry.as_ref().expect("registry attached before first command")
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::AttachRegistry(registry) => self.registry = Some(registry),
                Command::Join { agent_id, reply } => {
                    let result = self.handle_join(agent_id).await;
                    let _ = reply.send(result);
                }
                Command::Status { agent_id, reply } => {
                    self.prune_queue();
                    let result = self.compute_status(agent_id);
                    let _ = reply.send(result);
                }
                Command::Leave { agent_id, reply } => {
                    let result = if self.active.contains_key(&agent_id) {
                        Err("already_matched")
                    } else {
                        self.queue.retain(|e| e.agent_id != agent_id);
                        Ok(())
                    };
                    let _ = reply.send(result);
                }
                Command::WaitForEvent { agent_id, timeout_secs, reply } => {
                    self.handle_wait(agent_id, timeout_secs, reply);
                }
                Command::WaitTimeout { agent_id } => {
                    if let Some(sender) = self.waiters.remove(&agent_id) {
                        let _ = sender.send(ServerEvent::NoEvents);
                    }
                }
                Command::FeaturedEnded { match_id } => {
                    self.handle_featured_ended(match_id);
                }
                Command::Featured { reply } => {
                    let snapshot = self.handle_featured().await;
                    let _ = reply.send(snapshot);
                }
                Command::Live { reply } => {
                    let result = self.handle_live().await;
                    let _ = reply.send(result);
                }
            }
        }
    }

    fn prune_queue(&mut self) {
        let ttl = self.config.queue_ttl;
        let now = Utc::now();
        self.queue.retain(|e| {
            now.signed_duration_since(e.enqueued_at)
                .to_std()
                .map(|age| age <= ttl)
                .unwrap_or(true)
        });
    }

    fn compute_status(&self, agent_id: Uuid) -> StatusResult {
        if let Some(active) = self.active.get(&agent_id) {
            return StatusResult::Ready { match_id: active.match_id, opponent_id: active.opponent_id };
        }
        if let Some(entry) = self.queue.iter().find(|e| e.agent_id == agent_id) {
            return StatusResult::Waiting { match_id: entry.match_id };
        }
        StatusResult::Idle
    }

    async fn handle_join(&mut self, agent_id: Uuid) -> JoinResult {
        if let Some(active) = self.active.get(&agent_id) {
            return JoinResult::Ready { match_id: active.match_id, opponent_id: active.opponent_id };
        }

        self.prune_queue();

        if let Some(entry) = self.queue.iter().find(|e| e.agent_id == agent_id) {
            return JoinResult::Waiting { match_id: entry.match_id };
        }

        let rating = leaderboard::rating_of(&self.db, agent_id).await.unwrap_or(crate::config::ELO_START);
        let last_opponent = self.recent_opponent.get(&agent_id).copied();

        let mut eligible: Vec<usize> = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, e)| e.agent_id != agent_id && (e.rating - rating).abs() <= self.config.elo_range)
            .map(|(i, _)| i)
            .collect();

        if let Some(last) = last_opponent {
            let filtered: Vec<usize> = eligible
                .iter()
                .copied()
                .filter(|&i| {
                    let candidate = &self.queue[i];
                    candidate.agent_id != last && self.recent_opponent.get(&candidate.agent_id) != Some(&agent_id)
                })
                .collect();
            if !filtered.is_empty() {
                eligible = filtered;
            }
        }

        eligible.sort_by(|&a, &b| {
            let ea = &self.queue[a];
            let eb = &self.queue[b];
            (ea.rating - rating)
                .abs()
                .cmp(&(eb.rating - rating).abs())
                .then(ea.enqueued_at.cmp(&eb.enqueued_at))
                .then(ea.agent_id.cmp(&eb.agent_id))
        });

        let Some(&best_idx) = eligible.first() else {
            let match_id = Uuid::new_v4();
            self.queue.push_back(QueueEntry { agent_id, match_id, rating, enqueued_at: Utc::now() });
            return JoinResult::Waiting { match_id };
        };

        let partner = self.queue.remove(best_idx).unwrap();
        let match_id = partner.match_id;

        let seed = rand::thread_rng().next_u64();
        let registry = self.registry().clone();
        let handle = registry.get_or_spawn(match_id).await;
        let players = [agent_id, partner.agent_id];
        let starting_ratings = [rating, partner.rating];
        if let Err(e) = handle
            .init(players, Some(seed), "ranked".to_string(), starting_ratings, [None, None])
            .await
        {
            tracing::error!(%match_id, error = %e, "match init failed, restoring partner to queue");
            self.queue.push_front(partner);
            return JoinResult::Unavailable;
        }

        let _ = match_player::insert_players(
            &self.db,
            match_id,
            &[
                match_player::NewMatchPlayer { agent_id, seat: 0, starting_rating: rating, prompt_version_id: None },
                match_player::NewMatchPlayer {
                    agent_id: partner.agent_id,
                    seat: 1,
                    starting_rating: partner.rating,
                    prompt_version_id: None,
                },
            ],
        )
        .await;

        self.active.insert(agent_id, ActiveMatchEntry { match_id, opponent_id: partner.agent_id });
        self.active.insert(partner.agent_id, ActiveMatchEntry { match_id, opponent_id: agent_id });
        self.recent_opponent.insert(agent_id, partner.agent_id);
        self.recent_opponent.insert(partner.agent_id, agent_id);

        self.enqueue_event(agent_id, ServerEvent::MatchFound { match_id, opponent_id: partner.agent_id });
        self.enqueue_event(partner.agent_id, ServerEvent::MatchFound { match_id, opponent_id: agent_id });

        self.enqueue_featured(match_id, players);

        JoinResult::Ready { match_id, opponent_id: partner.agent_id }
    }

    fn handle_wait(&mut self, agent_id: Uuid, timeout_secs: u64, reply: oneshot::Sender<ServerEvent>) {
        if let Some(buffer) = self.event_buffers.get_mut(&agent_id) {
            if let Some(event) = buffer.pop_front() {
                let _ = reply.send(event);
                return;
            }
        }

        self.waiters.insert(agent_id, reply);
        let tx = self.self_tx.clone();
        let timeout = StdDuration::from_secs(timeout_secs.max(1));
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Command::WaitTimeout { agent_id }).await;
        });
    }

    /// Deliver directly to a registered waiter, bypassing the buffer, or
    /// append to the bounded per-agent buffer (spec §9 "Long-poll waiters").
    fn enqueue_event(&mut self, agent_id: Uuid, event: ServerEvent) {
        if let Some(sender) = self.waiters.remove(&agent_id) {
            let _ = sender.send(event);
            return;
        }
        let buffer = self.event_buffers.entry(agent_id).or_default();
        if buffer.len() >= self.config.event_buffer_max {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    fn handle_featured_ended(&mut self, match_id: Uuid) {
        self.active.retain(|_, entry| entry.match_id != match_id);

        if self.featured == Some(match_id) {
            self.featured = None;
            self.featured_cache = None;
            self.rotate_featured_sync();
        }
    }

    fn rotate_featured_sync(&mut self) {
        while let Some(&candidate) = self.featured_queue.front() {
            self.featured_queue.pop_front();
            self.featured = Some(candidate);
            break;
        }
    }

    fn enqueue_featured(&mut self, match_id: Uuid, players: [Uuid; 2]) {
        let _ = players;
        if self.featured.is_none() {
            self.featured = Some(match_id);
            self.featured_cache = None;
        } else if !self.featured_queue.contains(&match_id) {
            self.featured_queue.push_back(match_id);
        }
    }

    async fn handle_featured(&mut self) -> FeaturedSnapshot {
        if let Some((snapshot, at)) = &self.featured_cache {
            if at.elapsed() <= self.config.featured_cache_ttl {
                return snapshot.clone();
            }
        }

        let snapshot = self.verify_featured().await;
        self.featured_cache = Some((snapshot.clone(), std::time::Instant::now()));
        snapshot
    }

    async fn verify_featured(&mut self) -> FeaturedSnapshot {
        loop {
            let Some(match_id) = self.featured else {
                return FeaturedSnapshot { match_id: None, status: None, players: None };
            };

            let row = crate::models::match_row::MatchRow::find(&self.db, match_id).await.ok().flatten();
            let row_active = row.as_ref().is_some_and(|r| r.is_active());

            let handle = self.registry().get_or_spawn(match_id).await;
            let state = handle.state().await;

            if row_active && state.is_some() {
                let state = state.unwrap();
                return FeaturedSnapshot {
                    match_id: Some(match_id),
                    status: Some("active".to_string()),
                    players: Some(state.players),
                };
            }

            self.featured = None;
            self.rotate_featured_sync();
            if self.featured.is_none() {
                return FeaturedSnapshot { match_id: None, status: None, players: None };
            }
        }
    }

    async fn handle_live(&mut self) -> (Option<Uuid>, Option<crate::actors::match_actor::MatchState>) {
        let snapshot = self.handle_featured().await;
        let Some(match_id) = snapshot.match_id else { return (None, None) };
        let handle = self.registry().get_or_spawn(match_id).await;
        (Some(match_id), handle.state().await)
    }
}
