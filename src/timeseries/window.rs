use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Symbolic duration accepted by the windowed endpoints.
///
/// Each token names a canonical window width. The analytics endpoint parses
/// these leniently (anything unrecognised becomes [`DurationToken::OneDay`]);
/// the graph endpoint parses strictly and rejects unknown tokens before any
/// store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationToken {
    OneHour,
    OneDay,
    SevenDays,
    ThirtyDays,
}

#[derive(Debug, Error)]
#[error("Invalid duration {0:?}. Valid values are: 1h, 24h, 7d, 30d")]
pub struct UnknownDuration(String);

impl FromStr for DurationToken {
    type Err = UnknownDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            other => Err(UnknownDuration(other.to_owned())),
        }
    }
}

impl DurationToken {
    /// Lenient parse: an absent or unrecognised token falls back to `24h`.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or(Self::OneDay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    /// The canonical width of the window this token names.
    pub fn span(&self) -> Duration {
        match self {
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::hours(24),
            Self::SevenDays => Duration::days(7),
            Self::ThirtyDays => Duration::days(30),
        }
    }
}

/// A resolved `[start, end)` instant range. Derived per query, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of `token`'s canonical width ending at the current instant.
    pub fn ending_now(token: DurationToken) -> Self {
        Self::ending_at(token, Utc::now())
    }

    /// Window of `token`'s canonical width with a caller-fixed `end`.
    pub fn ending_at(token: DurationToken, end: DateTime<Utc>) -> Self {
        Self {
            start: end - token.span(),
            end,
        }
    }

    pub fn width_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Range semantics are half-open: `start <= t < end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_strictly() {
        assert_eq!("1h".parse::<DurationToken>().unwrap(), DurationToken::OneHour);
        assert_eq!("24h".parse::<DurationToken>().unwrap(), DurationToken::OneDay);
        assert_eq!("7d".parse::<DurationToken>().unwrap(), DurationToken::SevenDays);
        assert_eq!("30d".parse::<DurationToken>().unwrap(), DurationToken::ThirtyDays);
    }

    #[test]
    fn unknown_token_is_a_strict_parse_error() {
        let err = "1w".parse::<DurationToken>().unwrap_err();
        assert!(err.to_string().contains("1h, 24h, 7d, 30d"));
    }

    #[test]
    fn lenient_parse_falls_back_to_one_day() {
        assert_eq!(DurationToken::parse_lenient(None), DurationToken::OneDay);
        assert_eq!(DurationToken::parse_lenient(Some("6h")), DurationToken::OneDay);
        assert_eq!(DurationToken::parse_lenient(Some("")), DurationToken::OneDay);
        assert_eq!(
            DurationToken::parse_lenient(Some("7d")),
            DurationToken::SevenDays
        );
    }

    #[test]
    fn resolved_window_widths_match_canonical_spans() {
        let now = Utc::now();
        let cases = [
            (DurationToken::OneHour, 3_600_000),
            (DurationToken::OneDay, 86_400_000),
            (DurationToken::SevenDays, 604_800_000),
            (DurationToken::ThirtyDays, 2_592_000_000),
        ];
        for (token, expected_ms) in cases {
            let window = TimeWindow::ending_at(token, now);
            assert_eq!(window.width_ms(), expected_ms, "token {}", token.as_str());
            assert_eq!(window.end, now);
        }
    }

    #[test]
    fn window_is_half_open() {
        let end = Utc::now();
        let window = TimeWindow::ending_at(DurationToken::OneHour, end);
        assert!(window.contains(window.start));
        assert!(window.contains(end - Duration::seconds(1)));
        assert!(!window.contains(end));
        assert!(!window.contains(window.start - Duration::seconds(1)));
    }
}
