use crate::error::ApplyError;
use crate::events::EngineEvent;
use crate::moves::Move;
use crate::rng;
use crate::side::Side;
use crate::state::{
    chebyshev, AgentId, GameState, Unit, ATTACK_RANGE, COLS, MOVE_RANGE, ROWS, STARTING_ATK,
    STARTING_HP, TURN_LIMIT_PER_SIDE, UNITS_PER_SIDE,
};

/// Optional overrides for `initial_state`. `None` uses the defaults in
/// [`crate::state`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub cols: Option<u8>,
    pub rows: Option<u8>,
}

/// Outcome of a terminal-state check (spec §4.1 `isTerminal`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Ongoing,
    Ended {
        winner: Option<AgentId>,
        reason: &'static str,
    },
}

/// Build the starting `GameState` for a fresh match. Pure and deterministic
/// in `seed` and `players` per spec §4.1.
pub fn initial_state(seed: u64, players: [AgentId; 2], config: Option<Config>) -> GameState {
    let config = config.unwrap_or_default();
    let cols = config.cols.unwrap_or(COLS);
    let rows = config.rows.unwrap_or(ROWS);

    let mut units = Vec::with_capacity(UNITS_PER_SIDE * 2);
    for i in 0..UNITS_PER_SIDE as u8 {
        units.push(Unit {
            id: format!("a{i}"),
            side: Side::A,
            hp: STARTING_HP,
            atk: STARTING_ATK,
            pos: (i * 2, 0),
            acted: false,
        });
        units.push(Unit {
            id: format!("b{i}"),
            side: Side::B,
            hp: STARTING_HP,
            atk: STARTING_ATK,
            pos: (i * 2, rows - 1),
            acted: false,
        });
    }

    GameState {
        seed,
        players,
        cols,
        rows,
        units,
        active_side: Side::A,
        turn_number: 0,
        rng_draws: 0,
        winner: None,
        terminal_reason: None,
    }
}

/// The agent whose turn it is (spec §4.1 `currentPlayer`).
pub fn current_player(game: &GameState) -> AgentId {
    game.agent_for(game.active_side)
}

/// Finite, order-stable, never-empty (for non-terminal states) legal-move
/// enumeration (spec §4.1 `listLegalMoves`).
pub fn list_legal_moves(game: &GameState) -> Vec<Move> {
    if matches!(is_terminal(game), Terminal::Ended { .. }) {
        return Vec::new();
    }

    let mut moves = Vec::new();
    let side = game.active_side;

    for unit in game.units_of(side) {
        if unit.acted {
            continue;
        }

        for x in 0..game.cols {
            for y in 0..game.rows {
                let dest = (x, y);
                if dest == unit.pos {
                    continue;
                }
                if chebyshev(unit.pos, dest) <= MOVE_RANGE && game.unit_at(dest).is_none() {
                    moves.push(Move::Move {
                        unit_id: unit.id.clone(),
                        destination: dest,
                    });
                }
            }
        }

        for target in game.units.iter().filter(|t| t.side == side.opp() && t.is_alive()) {
            if chebyshev(unit.pos, target.pos) <= ATTACK_RANGE {
                moves.push(Move::Attack {
                    unit_id: unit.id.clone(),
                    target: target.pos,
                });
            }
        }
    }

    moves.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    moves.push(Move::EndTurn);
    moves
}

/// Validate a move's shape independent of current legality — schema errors
/// forfeit the submitter under `invalid_move_schema` (spec §4.2 step 6),
/// distinct from `illegal_move` (shape ok, not presently legal). Exposed so
/// callers that must interleave their own checks between schema validation
/// and legality (e.g. turn/ownership checks) don't have to duplicate this
/// logic.
pub fn validate_schema(game: &GameState, mv: &Move) -> Result<(), ApplyError> {
    match mv {
        Move::Move { unit_id, destination } => {
            if game.unit(unit_id).is_none() {
                return Err(ApplyError::InvalidMoveSchema);
            }
            if !game.is_on_board(*destination) {
                return Err(ApplyError::InvalidMoveSchema);
            }
        }
        Move::Attack { unit_id, target } => {
            if game.unit(unit_id).is_none() {
                return Err(ApplyError::InvalidMoveSchema);
            }
            if !game.is_on_board(*target) {
                return Err(ApplyError::InvalidMoveSchema);
            }
        }
        Move::EndTurn => {}
    }
    Ok(())
}

/// Apply a move to `game`, returning the successor state and the events it
/// produced, or the reason it was refused (spec §4.1 `applyMove`).
pub fn apply_move(
    game: &GameState,
    mv: &Move,
) -> Result<(GameState, Vec<EngineEvent>), ApplyError> {
    if matches!(is_terminal(game), Terminal::Ended { .. }) {
        return Err(ApplyError::Terminal);
    }

    validate_schema(game, mv)?;

    let legal = list_legal_moves(game);
    if !legal.contains(mv) {
        return Err(ApplyError::IllegalMove);
    }

    let mut next = game.clone();
    let mut events = Vec::new();

    match mv {
        Move::Move { unit_id, destination } => {
            let from = next.unit(unit_id).map(|u| u.pos).ok_or(ApplyError::InvalidMove)?;
            let unit = next.unit_mut(unit_id).ok_or(ApplyError::InvalidMove)?;
            unit.pos = *destination;
            unit.acted = true;
            events.push(EngineEvent::UnitMoved {
                unit_id: unit_id.clone(),
                from,
                to: *destination,
            });
        }
        Move::Attack { unit_id, target } => {
            let attacker_atk = next.unit(unit_id).ok_or(ApplyError::InvalidMove)?.atk;
            let target_id = next
                .unit_at(*target)
                .map(|u| u.id.clone())
                .ok_or(ApplyError::InvalidMove)?;

            let draw = next.rng_draws;
            next.rng_draws += 1;
            let amount = rng::damage_variance(next.seed, draw, attacker_atk);

            let target_unit = next.unit_mut(&target_id).ok_or(ApplyError::InvalidMove)?;
            target_unit.hp -= amount;
            let hp_after = target_unit.hp;
            let target_side = target_unit.side;

            next.unit_mut(unit_id).ok_or(ApplyError::InvalidMove)?.acted = true;

            events.push(EngineEvent::DamageDealt {
                attacker_id: unit_id.clone(),
                target_id: target_id.clone(),
                amount,
                target_hp_after: hp_after,
            });

            if hp_after <= 0 {
                events.push(EngineEvent::UnitDefeated {
                    unit_id: target_id,
                    side: target_side,
                });
            }
        }
        Move::EndTurn => {
            let new_active = next.active_side.opp();
            next.active_side = new_active;
            next.turn_number += 1;
            for unit in next.units.iter_mut().filter(|u| u.side == new_active) {
                unit.acted = false;
            }
            events.push(EngineEvent::TurnEnded {
                new_active_side: new_active,
                turn_number: next.turn_number,
            });
        }
    }

    if let Terminal::Ended { winner, reason } = is_terminal(&next) {
        next.winner = winner.map(|agent| {
            if agent == next.players[0] {
                Side::A
            } else {
                Side::B
            }
        });
        next.terminal_reason = Some(reason.to_string());
        events.push(EngineEvent::GameEnded {
            winner: next.winner,
            reason: reason.to_string(),
        });
    }

    Ok((next, events))
}

/// Terminal-state check (spec §4.1 `isTerminal`). A side with no surviving
/// units loses; exhausting the per-side turn cap is a draw.
pub fn is_terminal(game: &GameState) -> Terminal {
    if game.winner.is_some() || game.terminal_reason.is_some() {
        let winner = game.winner.map(|s| game.agent_for(s));
        return Terminal::Ended {
            winner,
            reason: leak_reason(game.terminal_reason.as_deref().unwrap_or("unknown")),
        };
    }

    let a_alive = game.side_has_units(Side::A);
    let b_alive = game.side_has_units(Side::B);

    match (a_alive, b_alive) {
        (true, true) => {
            if game.turn_number >= TURN_LIMIT_PER_SIDE * 2 {
                Terminal::Ended {
                    winner: None,
                    reason: "turn_limit",
                }
            } else {
                Terminal::Ongoing
            }
        }
        (true, false) => Terminal::Ended {
            winner: Some(game.agent_for(Side::A)),
            reason: "elimination",
        },
        (false, true) => Terminal::Ended {
            winner: Some(game.agent_for(Side::B)),
            reason: "elimination",
        },
        (false, false) => Terminal::Ended {
            winner: None,
            reason: "elimination",
        },
    }
}

// `reason` strings above are all 'static; this just lets callers that
// already stored a dynamic String (from a previous terminal check) hand it
// back out as a 'static str without an extra allocation in the common path.
fn leak_reason(reason: &str) -> &'static str {
    match reason {
        "turn_limit" => "turn_limit",
        "elimination" => "elimination",
        "forfeit" => "forfeit",
        "turn_timeout" => "turn_timeout",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> [AgentId; 2] {
        [AgentId::from_u128(1), AgentId::from_u128(2)]
    }

    #[test]
    fn initial_state_places_units_on_home_rows() {
        let game = initial_state(1, players(), None);
        assert_eq!(game.units.len(), UNITS_PER_SIDE * 2);
        assert!(game.units_of(Side::A).all(|u| u.pos.1 == 0));
        assert!(game.units_of(Side::B).all(|u| u.pos.1 == ROWS - 1));
        assert_eq!(game.active_side, Side::A);
    }

    #[test]
    fn current_player_is_active_side_agent() {
        let ps = players();
        let game = initial_state(1, ps, None);
        assert_eq!(current_player(&game), ps[0]);
    }

    #[test]
    fn legal_moves_never_empty_for_ongoing_game() {
        let game = initial_state(1, players(), None);
        let moves = list_legal_moves(&game);
        assert!(!moves.is_empty());
        assert_eq!(moves.last(), Some(&Move::EndTurn));
    }

    #[test]
    fn end_turn_flips_active_side_and_resets_acted() {
        let game = initial_state(1, players(), None);
        let (next, events) = apply_move(&game, &Move::EndTurn).unwrap();
        assert_eq!(next.active_side, Side::B);
        assert_eq!(next.turn_number, 1);
        assert!(matches!(events[0], EngineEvent::TurnEnded { .. }));
    }

    #[test]
    fn attack_out_of_range_is_illegal() {
        let game = initial_state(1, players(), None);
        let mv = Move::Attack {
            unit_id: "a0".to_string(),
            target: (0, 4),
        };
        assert_eq!(apply_move(&game, &mv), Err(ApplyError::IllegalMove));
    }

    #[test]
    fn unknown_unit_is_schema_invalid() {
        let game = initial_state(1, players(), None);
        let mv = Move::Move {
            unit_id: "ghost".to_string(),
            destination: (0, 1),
        };
        assert_eq!(apply_move(&game, &mv), Err(ApplyError::InvalidMoveSchema));
    }

    #[test]
    fn off_board_destination_is_schema_invalid() {
        let game = initial_state(1, players(), None);
        let mv = Move::Move {
            unit_id: "a0".to_string(),
            destination: (200, 200),
        };
        assert_eq!(apply_move(&game, &mv), Err(ApplyError::InvalidMoveSchema));
    }

    #[test]
    fn applying_move_after_terminal_is_refused() {
        let mut game = initial_state(1, players(), None);
        game.winner = Some(Side::A);
        game.terminal_reason = Some("elimination".to_string());
        assert_eq!(apply_move(&game, &Move::EndTurn), Err(ApplyError::Terminal));
        assert!(list_legal_moves(&game).is_empty());
    }

    #[test]
    fn determinism_same_seed_same_moves_same_outcome() {
        let ps = players();
        let replay_moves = |seed: u64| -> (GameState, Vec<EngineEvent>) {
            let mut state = initial_state(seed, ps, None);
            let mut all_events = Vec::new();
            for _ in 0..3 {
                let mv = Move::Attack {
                    unit_id: "a0".to_string(),
                    target: state.unit_at((0, 4)).map(|u| u.pos).unwrap_or((0, 4)),
                };
                if let Ok((next, events)) = apply_move(&state, &mv) {
                    state = next;
                    all_events.extend(events);
                } else {
                    let (next, events) = apply_move(&state, &Move::EndTurn).unwrap();
                    state = next;
                    all_events.extend(events);
                }
            }
            (state, all_events)
        };

        let (s1, e1) = replay_moves(99);
        let (s2, e2) = replay_moves(99);
        assert_eq!(s1.units.iter().map(|u| u.hp).collect::<Vec<_>>(),
                   s2.units.iter().map(|u| u.hp).collect::<Vec<_>>());
        assert_eq!(e1, e2);
    }

    #[test]
    fn turn_limit_produces_draw() {
        let mut game = initial_state(1, players(), None);
        for _ in 0..(TURN_LIMIT_PER_SIDE * 2) {
            let (next, _) = apply_move(&game, &Move::EndTurn).unwrap();
            game = next;
        }
        match is_terminal(&game) {
            Terminal::Ended { winner, reason } => {
                assert_eq!(winner, None);
                assert_eq!(reason, "turn_limit");
            }
            Terminal::Ongoing => panic!("expected terminal by turn limit"),
        }
    }
}
