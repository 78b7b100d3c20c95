pub mod engine;
pub mod error;
pub mod events;
pub mod moves;
pub mod rng;
pub mod side;
pub mod state;

pub use engine::{current_player, initial_state, is_terminal, list_legal_moves, apply_move, validate_schema, Config, Terminal};
pub use error::ApplyError;
pub use events::EngineEvent;
pub use moves::Move;
pub use side::Side;
pub use state::{AgentId, GameState, Point, Unit};
