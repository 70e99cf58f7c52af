use std::fmt;

use serde::Serialize;

/// Period-over-period change of a count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    /// No previous window (all-time).
    Unavailable,
    /// Previous was zero, current is not.
    Infinite,
    /// Both zero.
    Zero,
    Percent(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Delta {
    pub fn compute(current: i64, previous: Option<i64>) -> Self {
        match previous {
            None => Delta::Unavailable,
            Some(0) if current > 0 => Delta::Infinite,
            Some(0) => Delta::Zero,
            Some(prev) => Delta::Percent((current - prev) as f64 / prev as f64 * 100.0),
        }
    }

    /// Taken from the rendered sign. A change that rounds to zero is neutral.
    pub fn direction(&self) -> Direction {
        let text = self.to_string();
        if text.starts_with('+') && text != "+0.0%" {
            Direction::Up
        } else if text.starts_with('-') && text != "-0.0%" {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Unavailable => f.write_str("—"),
            Delta::Infinite => f.write_str("+∞%"),
            Delta::Zero => f.write_str("0%"),
            Delta::Percent(p) => write!(f, "{p:+.1}%"),
        }
    }
}

impl Serialize for Delta {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_strings() {
        assert_eq!(Delta::compute(10, Some(0)).to_string(), "+∞%");
        assert_eq!(Delta::compute(0, Some(0)).to_string(), "0%");
        assert_eq!(Delta::compute(15, Some(10)).to_string(), "+50.0%");
        assert_eq!(Delta::compute(5, Some(10)).to_string(), "-50.0%");
        assert_eq!(Delta::compute(7, None).to_string(), "—");
    }

    #[test]
    fn test_delta_unchanged_is_signed_zero() {
        assert_eq!(Delta::compute(10, Some(10)).to_string(), "+0.0%");
        assert_eq!(Delta::compute(10, Some(10)).direction(), Direction::Neutral);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Delta::compute(15, Some(10)).direction(), Direction::Up);
        assert_eq!(Delta::compute(5, Some(10)).direction(), Direction::Down);
        assert_eq!(Delta::compute(1, Some(0)).direction(), Direction::Up);
        assert_eq!(Delta::compute(0, Some(0)).direction(), Direction::Neutral);
        assert_eq!(Delta::Unavailable.direction(), Direction::Neutral);
    }

    #[test]
    fn test_delta_serializes_as_text() {
        assert_eq!(
            serde_json::to_string(&Delta::compute(3, Some(2))).unwrap(),
            "\"+50.0%\""
        );
    }
}
