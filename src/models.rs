use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRecord {
    pub customer_id: String,
    #[serde(deserialize_with = "crate::source::deserialize_login_date")]
    pub login_date: NaiveDateTime,
    pub session_duration: f64,
    pub inactive_duration: f64,
    pub session_projects_added: u32,
    pub session_likes_given: u32,
    pub session_comments_given: u32,
    pub bugs_in_session: u32,
}

impl SessionRecord {
    /// A session counts as active when it was not idle for its whole length.
    pub fn is_active(&self) -> bool {
        self.inactive_duration < self.session_duration
    }

    pub fn login_day(&self) -> NaiveDate {
        self.login_date.date()
    }
}

/// Ordered, read-only table of sessions. Reports borrow it and never mutate it.
#[derive(Debug, Clone, Default)]
pub struct SessionDataset {
    records: Vec<SessionRecord>,
}

impl SessionDataset {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_chronological(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].login_date <= pair[1].login_date)
    }

    /// Stable sort by login timestamp, so ties keep their source order.
    pub fn sorted_by_login(&self) -> Self {
        let mut records = self.records.clone();
        records.sort_by_key(|record| record.login_date);
        Self { records }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    pub week: NaiveDate,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSessions {
    pub all: Vec<WeeklyCount>,
    pub valid: Vec<WeeklyCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserBreakdown {
    pub week: NaiveDate,
    pub unique: u64,
    pub returning: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyEngagement {
    pub week: NaiveDate,
    pub projects: u64,
    pub likes: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariationRow {
    pub week: NaiveDate,
    pub projects: f64,
    pub likes: f64,
    pub comments: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyBugs {
    pub week: NaiveDate,
    pub bugs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugCorrelation {
    pub comment_variation: Vec<VariationRow>,
    pub bugs: Vec<WeeklyBugs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyDuration {
    pub date: NaiveDate,
    pub minutes: f64,
}
