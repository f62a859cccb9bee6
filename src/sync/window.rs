//! Fetch window computation.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{MAX_BOUNDARY_EPSILON_MS, MAX_LOOKBACK_HOURS, SyncConfig};

/// Inclusive time range a run asks the source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPlanner {
    default_lookback: Duration,
    full_lookback: Duration,
    rescan: Duration,
    epsilon: Duration,
}

impl WindowPlanner {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            default_lookback: hours(config.default_lookback_hours),
            full_lookback: hours(config.full_sync_lookback_days.saturating_mul(24)),
            rescan: hours(config.status_refresh_days.saturating_mul(24)),
            epsilon: Duration::milliseconds(
                i64::try_from(config.boundary_epsilon_ms.min(MAX_BOUNDARY_EPSILON_MS))
                    .unwrap_or_default(),
            ),
        }
    }

    /// Window for a watermark task.
    ///
    /// `end` is the run start. A stored watermark starts the window
    /// `epsilon` early so a record stamped exactly on the boundary is not
    /// lost; without one (or in full mode) the window reaches back by the
    /// lookback, which `lookback_override` replaces.
    pub fn watermark(
        &self,
        prior: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        full: bool,
        lookback_override: Option<Duration>,
    ) -> SyncWindow {
        let start = match prior {
            Some(cursor) if !full => cursor.checked_sub_signed(self.epsilon).unwrap_or(cursor),
            _ => {
                let fallback = if full {
                    self.full_lookback
                } else {
                    self.default_lookback
                };
                now - lookback_override.unwrap_or(fallback)
            }
        };
        SyncWindow {
            start: start.min(now),
            end: now,
        }
    }

    /// Window for a rescan task: the trailing refresh period.
    pub fn rescan(&self, now: DateTime<Utc>, lookback_override: Option<Duration>) -> SyncWindow {
        SyncWindow {
            start: now - lookback_override.unwrap_or(self.rescan),
            end: now,
        }
    }
}

/// Watermark after a successful run; never earlier than `prior`.
pub fn advance(prior: Option<DateTime<Utc>>, window_end: DateTime<Utc>) -> DateTime<Utc> {
    prior.map_or(window_end, |cursor| cursor.max(window_end))
}

fn hours(value: u64) -> Duration {
    Duration::hours(i64::try_from(value.min(MAX_LOOKBACK_HOURS)).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn planner() -> WindowPlanner {
        WindowPlanner::from_config(&SyncConfig::default())
    }

    #[test]
    fn stored_cursor_starts_window_with_epsilon_overlap() {
        let window = planner().watermark(Some(at(10)), at(11), false, None);
        assert_eq!(window.start, at(10) - Duration::seconds(1));
        assert_eq!(window.end, at(11));
    }

    #[test]
    fn missing_cursor_uses_default_lookback() {
        let window = planner().watermark(None, at(11), false, None);
        assert_eq!(window.start, at(10));

        let overridden = planner().watermark(None, at(11), false, Some(Duration::hours(48)));
        assert_eq!(overridden.start, at(9));
    }

    #[test]
    fn full_mode_ignores_cursor() {
        let window = planner().watermark(Some(at(10)), at(11), true, Some(Duration::hours(72)));
        assert_eq!(window.start, at(8));
    }

    #[test]
    fn future_cursor_never_produces_inverted_window() {
        let window = planner().watermark(Some(at(20)), at(11), false, None);
        assert_eq!(window.start, at(11));
        assert_eq!(window.end, at(11));
    }

    #[test]
    fn oversized_epsilon_is_capped_at_one_hour() {
        let planner = WindowPlanner::from_config(&SyncConfig {
            boundary_epsilon_ms: u64::MAX,
            ..SyncConfig::default()
        });
        let window = planner.watermark(Some(at(10)), at(11), false, None);
        assert_eq!(window.start, at(10) - Duration::hours(1));
    }

    #[test]
    fn watermark_never_regresses() {
        assert_eq!(advance(Some(at(20)), at(11)), at(20));
        assert_eq!(advance(Some(at(10)), at(11)), at(11));
        assert_eq!(advance(None, at(11)), at(11));
    }

    #[test]
    fn rescan_covers_refresh_period() {
        let window = planner().rescan(at(16), None);
        assert_eq!(window.start, at(1));
    }
}
