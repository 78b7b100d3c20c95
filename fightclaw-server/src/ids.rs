use std::fmt;

use uuid::Uuid;

pub use fightclaw_engine::AgentId;

pub type MatchId = Uuid;

/// Parses a path segment as a `MatchId`, mapping failure to the wire-stable
/// `invalid_match_id` code (spec §7) rather than a raw 400.
pub fn parse_match_id(raw: &str) -> Result<MatchId, crate::error::AppError> {
    Uuid::parse_str(raw).map_err(|_| crate::error::AppError::InvalidMatchId)
}

fn is_runner_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')
}

/// Short printable token identifying a trusted automation process.
/// Validated against `^[A-Za-z0-9][A-Za-z0-9._:-]{2,63}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunnerId(String);

impl RunnerId {
    pub fn parse(raw: &str) -> Option<Self> {
        let len = raw.len();
        if !(3..=64).contains(&len) || !raw.is_ascii() {
            return None;
        }
        let mut chars = raw.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphanumeric() {
            return None;
        }
        if chars.all(is_runner_char) {
            Some(RunnerId(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_runner_ids() {
        assert!(RunnerId::parse("runner-01").is_some());
        assert!(RunnerId::parse("a.b:c_d").is_some());
    }

    #[test]
    fn rejects_too_short_or_leading_punctuation() {
        assert!(RunnerId::parse("ab").is_none());
        assert!(RunnerId::parse("-runner").is_none());
        assert!(RunnerId::parse("").is_none());
    }
}
