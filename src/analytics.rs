use std::collections::HashSet;

use tracing::{debug, warn};

use crate::buckets::{bucket_daily, bucket_weekly, pct_change};
use crate::models::{
    ActiveSessions, BugCorrelation, DailyDuration, SessionDataset, SessionRecord, UserBreakdown,
    VariationRow, WeeklyBugs, WeeklyCount, WeeklyEngagement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Drop the last weekly bucket from variation and bug series, since the
    /// final window of an export is usually cut short.
    pub trim_trailing_week: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            trim_trailing_week: true,
        }
    }
}

/// Read-only reporting over one session table. Every method recomputes its
/// buckets from the records.
#[derive(Debug, Clone)]
pub struct WeeklyAnalyticsReport<'a> {
    data: &'a SessionDataset,
    options: ReportOptions,
}

impl<'a> WeeklyAnalyticsReport<'a> {
    pub fn new(data: &'a SessionDataset) -> Self {
        Self::with_options(data, ReportOptions::default())
    }

    pub fn with_options(data: &'a SessionDataset, options: ReportOptions) -> Self {
        Self { data, options }
    }

    pub fn options(&self) -> ReportOptions {
        self.options
    }

    pub fn active_sessions(&self) -> ActiveSessions {
        let records = self.data.records();
        let count = |sessions: &mut u64, _: &SessionRecord| *sessions += 1;

        let all = bucket_weekly(records, 0u64, count)
            .into_iter()
            .map(|(week, sessions)| WeeklyCount { week, sessions })
            .collect();
        let valid = bucket_weekly(records.iter().filter(|r| r.is_active()), 0u64, count)
            .into_iter()
            .map(|(week, sessions)| WeeklyCount { week, sessions })
            .collect();

        ActiveSessions { all, valid }
    }

    /// Flags each session as the customer's first or a return visit, in
    /// dataset order. Sort by login first if "first" must mean earliest.
    pub fn unique_vs_returning_users(&self) -> Vec<UserBreakdown> {
        if !self.data.is_chronological() {
            warn!(
                records = self.data.len(),
                "dataset is not sorted by login_date; unique users follow row order"
            );
        }

        let mut seen: HashSet<&str> = HashSet::new();
        bucket_weekly(self.data.records(), (0u64, 0u64), |(unique, returning), record| {
            if seen.insert(record.customer_id.as_str()) {
                *unique += 1;
            } else {
                *returning += 1;
            }
        })
        .into_iter()
        .map(|(week, (unique, returning))| UserBreakdown {
            week,
            unique,
            returning,
        })
        .collect()
    }

    pub fn events_engagement(&self) -> Vec<WeeklyEngagement> {
        bucket_weekly(self.data.records(), (0u64, 0u64, 0u64), |sums, record| {
            sums.0 += u64::from(record.session_projects_added);
            sums.1 += u64::from(record.session_likes_given);
            sums.2 += u64::from(record.session_comments_given);
        })
        .into_iter()
        .map(|(week, (projects, likes, comments))| WeeklyEngagement {
            week,
            projects,
            likes,
            comments,
        })
        .collect()
    }

    pub fn percent_variation(&self) -> Vec<VariationRow> {
        let weeks = self.events_engagement();
        let projects = pct_change(&weeks.iter().map(|w| w.projects as f64).collect::<Vec<_>>());
        let likes = pct_change(&weeks.iter().map(|w| w.likes as f64).collect::<Vec<_>>());
        let comments = pct_change(&weeks.iter().map(|w| w.comments as f64).collect::<Vec<_>>());

        let mut rows: Vec<VariationRow> = weeks
            .iter()
            .enumerate()
            .filter_map(|(index, week)| {
                Some(VariationRow {
                    week: week.week,
                    projects: projects[index]?,
                    likes: likes[index]?,
                    comments: comments[index]?,
                })
            })
            .collect();

        if self.options.trim_trailing_week {
            rows.truncate(weeks.len().saturating_sub(2));
        }
        debug!(weeks = weeks.len(), rows = rows.len(), "computed percent variation");
        rows
    }

    pub fn source_of_bugs(&self) -> BugCorrelation {
        let comment_variation = self.percent_variation();
        let mut bugs: Vec<WeeklyBugs> = bucket_weekly(self.data.records(), 0u64, |bugs, record| {
            *bugs += u64::from(record.bugs_in_session);
        })
        .into_iter()
        .map(|(week, bugs)| WeeklyBugs { week, bugs })
        .collect();

        if self.options.trim_trailing_week {
            bugs.pop();
        }

        BugCorrelation {
            comment_variation,
            bugs,
        }
    }

    pub fn average_session_duration(&self) -> Vec<DailyDuration> {
        bucket_daily(self.data.records(), (0.0f64, 0u64), |(total, count), record| {
            *total += record.session_duration;
            *count += 1;
        })
        .into_iter()
        .map(|(date, (total, count))| DailyDuration {
            date,
            minutes: total / count as f64 / 60.0,
        })
        .collect()
    }
}
