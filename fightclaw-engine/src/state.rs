use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::side::Side;

pub type Point = (u8, u8);
pub type AgentId = Uuid;

pub const COLS: u8 = 8;
pub const ROWS: u8 = 5;
pub const STARTING_HP: i32 = 10;
pub const STARTING_ATK: i32 = 3;
pub const MOVE_RANGE: u8 = 2;
pub const ATTACK_RANGE: u8 = 1;
pub const UNITS_PER_SIDE: usize = 3;
pub const TURN_LIMIT_PER_SIDE: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub side: Side,
    pub hp: i32,
    pub atk: i32,
    pub pos: Point,
    /// Cleared at the start of each of this side's turns.
    pub acted: bool,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// Opaque engine payload referenced by spec §3 as `game: GameState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub seed: u64,
    pub players: [AgentId; 2],
    pub cols: u8,
    pub rows: u8,
    pub units: Vec<Unit>,
    pub active_side: Side,
    /// Turn number from match start, incremented once per `end_turn`.
    pub turn_number: u32,
    /// Monotone counter of random draws consumed so far; part of state so
    /// replay from (seed, moves) reproduces every roll exactly.
    pub rng_draws: u64,
    pub winner: Option<Side>,
    pub terminal_reason: Option<String>,
}

impl GameState {
    pub fn agent_for(&self, side: Side) -> AgentId {
        self.players[side.seat()]
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn unit_mut(&mut self, unit_id: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == unit_id)
    }

    pub fn unit_at(&self, point: Point) -> Option<&Unit> {
        self.units.iter().find(|u| u.is_alive() && u.pos == point)
    }

    pub fn units_of(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.side == side && u.is_alive())
    }

    pub fn side_has_units(&self, side: Side) -> bool {
        self.units_of(side).next().is_some()
    }

    pub fn is_on_board(&self, point: Point) -> bool {
        point.0 < self.cols && point.1 < self.rows
    }
}

pub fn chebyshev(a: Point, b: Point) -> u8 {
    let dx = (a.0 as i16 - b.0 as i16).unsigned_abs() as u8;
    let dy = (a.1 as i16 - b.1 as i16).unsigned_abs() as u8;
    dx.max(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, side: Side, pos: Point) -> Unit {
        Unit {
            id: id.to_string(),
            side,
            hp: STARTING_HP,
            atk: STARTING_ATK,
            pos,
            acted: false,
        }
    }

    #[test]
    fn chebyshev_distance_is_max_of_axes() {
        assert_eq!(chebyshev((0, 0), (2, 1)), 2);
        assert_eq!(chebyshev((3, 3), (3, 3)), 0);
        assert_eq!(chebyshev((0, 4), (7, 0)), 7);
    }

    #[test]
    fn side_has_units_false_when_all_dead() {
        let mut state = GameState {
            seed: 1,
            players: [Uuid::nil(), Uuid::nil()],
            cols: COLS,
            rows: ROWS,
            units: vec![unit("a0", Side::A, (0, 0))],
            active_side: Side::A,
            turn_number: 0,
            rng_draws: 0,
            winner: None,
            terminal_reason: None,
        };
        assert!(state.side_has_units(Side::A));
        state.units[0].hp = 0;
        assert!(!state.side_has_units(Side::A));
    }
}
