use chrono::{DateTime, Days, Utc};
use serde::Serialize;

use super::visitor::{timestamp_token, Visitor};

/// Daily, weekly and total sign-in counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub today: usize,
    pub week: usize,
    pub total: usize,
    pub last_updated: String,
}

impl VisitorStats {
    /// Counts records by the UTC calendar day of `created_at`. Records whose
    /// timestamp cannot be parsed only count towards the total.
    pub fn compute(visitors: &[Visitor], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let week_start = today.checked_sub_days(Days::new(7)).unwrap_or(today);

        let days: Vec<_> = visitors
            .iter()
            .filter_map(|v| v.created_at_utc())
            .map(|ts| ts.date_naive())
            .collect();

        Self {
            today: days.iter().filter(|d| **d == today).count(),
            week: days.iter().filter(|d| **d >= week_start).count(),
            total: visitors.len(),
            last_updated: timestamp_token(now),
        }
    }
}

/// Where the next visitor falls in today's sign-in queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePosition {
    pub today_position: usize,
    pub total_count: usize,
    pub last_updated: String,
}

impl QueuePosition {
    pub fn compute(visitors: &[Visitor], now: DateTime<Utc>) -> Self {
        let stats = VisitorStats::compute(visitors, now);
        Self {
            today_position: stats.today + 1,
            total_count: stats.total,
            last_updated: stats.last_updated,
        }
    }
}
