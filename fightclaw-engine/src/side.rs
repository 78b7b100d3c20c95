use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use std::ops::Neg;

/// Which seat a unit or player belongs to. Seat 0 = A, seat 1 = B (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum Side {
    A = 0,
    B = 1,
}

impl Side {
    pub fn from_seat(seat: usize) -> Option<Self> {
        match seat {
            0 => Some(Side::A),
            1 => Some(Side::B),
            _ => None,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub fn opp(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl Neg for Side {
    type Output = Self;

    fn neg(self) -> Self {
        self.opp()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent() {
        assert_eq!(Side::A.opp(), Side::B);
        assert_eq!(Side::B.opp(), Side::A);
    }

    #[test]
    fn negation() {
        assert_eq!(-Side::A, Side::B);
        assert_eq!(-Side::B, Side::A);
    }

    #[test]
    fn seat_round_trip() {
        assert_eq!(Side::from_seat(Side::A.seat()), Some(Side::A));
        assert_eq!(Side::from_seat(Side::B.seat()), Some(Side::B));
        assert_eq!(Side::from_seat(2), None);
    }
}
