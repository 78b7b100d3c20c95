use std::fmt;

/// Reasons `engine::apply_move` can refuse a move. These map 1:1 onto the
/// wire-stable `reasonCode`s MatchActor forfeits the submitter under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyError {
    /// The move's shape is malformed (unknown unit, out-of-board coordinates, ...).
    InvalidMoveSchema,
    /// The move is well-formed but not presently legal (out of range, wrong turn, ...).
    IllegalMove,
    /// The move matched no recognized action at all.
    InvalidMove,
    /// The game already ended; no further moves apply.
    Terminal,
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::InvalidMoveSchema => write!(f, "invalid_move_schema"),
            ApplyError::IllegalMove => write!(f, "illegal_move"),
            ApplyError::InvalidMove => write!(f, "invalid_move"),
            ApplyError::Terminal => write!(f, "terminal"),
        }
    }
}

impl std::error::Error for ApplyError {}
