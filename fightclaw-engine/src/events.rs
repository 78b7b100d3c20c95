use serde::{Deserialize, Serialize};

use crate::side::Side;
use crate::state::Point;

/// Engine-emitted observations of a single `apply_move` call. These are the
/// only public window into combat outcomes (spec §4.1) and are persisted
/// and streamed verbatim by MatchActor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    UnitMoved {
        unit_id: String,
        from: Point,
        to: Point,
    },
    DamageDealt {
        attacker_id: String,
        target_id: String,
        amount: i32,
        target_hp_after: i32,
    },
    UnitDefeated {
        unit_id: String,
        side: Side,
    },
    TurnEnded {
        new_active_side: Side,
        turn_number: u32,
    },
    GameEnded {
        winner: Option<Side>,
        reason: String,
    },
}
