use serde::{Deserialize, Serialize};

use crate::state::Point;

/// A move submitted by an agent. Untagged-by-action JSON shape:
/// `{"action":"move","unitId":"a0","destination":[2,1]}`,
/// `{"action":"attack","unitId":"a0","target":[3,1]}`, `{"action":"end_turn"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Move {
    Move {
        #[serde(rename = "unitId")]
        unit_id: String,
        destination: Point,
    },
    Attack {
        #[serde(rename = "unitId")]
        unit_id: String,
        target: Point,
    },
    EndTurn,
}

impl Move {
    pub fn unit_id(&self) -> Option<&str> {
        match self {
            Move::Move { unit_id, .. } => Some(unit_id),
            Move::Attack { unit_id, .. } => Some(unit_id),
            Move::EndTurn => None,
        }
    }

    /// Sort key used by `list_legal_moves` for the `(unitId, destination)`
    /// lexicographic ordering spec §4.1 requires.
    pub fn sort_key(&self) -> (&str, Point) {
        match self {
            Move::Move {
                unit_id,
                destination,
            } => (unit_id.as_str(), *destination),
            Move::Attack { unit_id, target } => (unit_id.as_str(), *target),
            Move::EndTurn => ("", (u8::MAX, u8::MAX)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_move_action() {
        let json = r#"{"action":"move","unitId":"a0","destination":[2,1]}"#;
        let mv: Move = serde_json::from_str(json).unwrap();
        assert_eq!(
            mv,
            Move::Move {
                unit_id: "a0".to_string(),
                destination: (2, 1),
            }
        );
    }

    #[test]
    fn parses_end_turn() {
        let mv: Move = serde_json::from_str(r#"{"action":"end_turn"}"#).unwrap();
        assert_eq!(mv, Move::EndTurn);
    }

    #[test]
    fn rejects_unknown_action() {
        let result: Result<Move, _> = serde_json::from_str(r#"{"action":"teleport"}"#);
        assert!(result.is_err());
    }
}
