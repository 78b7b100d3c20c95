pub mod agent;
pub mod leaderboard;
pub mod match_actor_state;
pub mod match_event;
pub mod match_player;
pub mod match_result;
pub mod match_row;
pub mod runner_ownership;
