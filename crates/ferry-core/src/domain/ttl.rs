//! TTL policy: bounds a client-requested lifetime.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Used when the client asks for nothing usable.
pub const DEFAULT_TTL_MINUTES: u32 = 5;

/// Upper bound on any lifetime.
pub const MAX_TTL_MINUTES: u32 = 20;

/// Lifetime policy for uploads.
///
/// - missing, non-numeric or `< 1` -> `default_minutes`
/// - `> max_minutes` -> `max_minutes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    pub default_minutes: u32,
    pub max_minutes: u32,
}

impl TtlPolicy {
    pub fn new(default_minutes: u32, max_minutes: u32) -> Self {
        Self {
            default_minutes,
            max_minutes,
        }
    }

    /// `1 <= default <= max`.
    pub fn is_valid(&self) -> bool {
        self.default_minutes >= 1 && self.default_minutes <= self.max_minutes
    }

    /// Clamp a requested lifetime into `[1, max_minutes]`.
    pub fn resolve(&self, requested_minutes: Option<i64>) -> u32 {
        match requested_minutes {
            Some(m) if m >= 1 => m.min(i64::from(self.max_minutes)) as u32,
            _ => self.default_minutes,
        }
    }

    /// [`resolve`](Self::resolve) for a raw form value such as `"7"`.
    pub fn resolve_raw(&self, raw: Option<&str>) -> u32 {
        self.resolve(raw.and_then(parse_minutes))
    }

    /// Lifetime as a duration.
    pub fn lifetime(&self, requested_minutes: Option<i64>) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.resolve(requested_minutes)))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES)
    }
}

/// Leading-integer parse: `" 12min"` -> 12, `"-3"` -> -3, `"abc"` -> None.
///
/// Values too large for `i64` saturate.
pub fn parse_minutes(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::in_range(Some(3), 3)]
    #[case::lower_bound(Some(1), 1)]
    #[case::upper_bound(Some(20), 20)]
    #[case::too_large(Some(1000), 20)]
    #[case::huge(Some(i64::MAX), 20)]
    #[case::zero(Some(0), 5)]
    #[case::negative(Some(-5), 5)]
    #[case::missing(None, 5)]
    fn resolve_clamps(#[case] requested: Option<i64>, #[case] expected: u32) {
        assert_eq!(TtlPolicy::default().resolve(requested), expected);
    }

    #[rstest]
    #[case("7", Some(7))]
    #[case(" 12min", Some(12))]
    #[case("+4", Some(4))]
    #[case("-5", Some(-5))]
    #[case("3.9", Some(3))]
    #[case("abc", None)]
    #[case("", None)]
    #[case("-", None)]
    #[case("99999999999999999999", Some(i64::MAX))]
    fn parses_leading_integer(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_minutes(raw), expected);
    }

    #[rstest]
    #[case(Some("1000"), 20)]
    #[case(Some("-5"), 5)]
    #[case(Some("soon"), 5)]
    #[case(Some("10"), 10)]
    #[case(None, 5)]
    fn resolve_raw_form_values(#[case] raw: Option<&str>, #[case] expected: u32) {
        assert_eq!(TtlPolicy::default().resolve_raw(raw), expected);
    }

    #[test]
    fn lifetime_is_in_minutes() {
        let policy = TtlPolicy::new(2, 10);
        assert_eq!(policy.lifetime(None), TimeDelta::minutes(2));
        assert_eq!(policy.lifetime(Some(30)), TimeDelta::minutes(10));
    }

    #[test]
    fn validity() {
        assert!(TtlPolicy::default().is_valid());
        assert!(!TtlPolicy::new(0, 20).is_valid());
        assert!(!TtlPolicy::new(30, 20).is_valid());
    }
}
