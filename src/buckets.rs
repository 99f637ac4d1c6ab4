use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::SessionRecord;

/// Label of the Tuesday..Monday week containing `date`: the Monday that closes it.
pub fn week_closing(date: NaiveDate) -> NaiveDate {
    let days_until_monday = (7 - date.weekday().num_days_from_monday() as i64) % 7;
    date + Duration::days(days_until_monday)
}

pub fn week_opening(week: NaiveDate) -> NaiveDate {
    week - Duration::days(6)
}

/// Folds records into contiguous weekly buckets. Weeks between the first and
/// last populated week are present and hold `zero`.
pub fn bucket_weekly<'a, V, I, F>(records: I, zero: V, mut add: F) -> Vec<(NaiveDate, V)>
where
    V: Clone,
    I: IntoIterator<Item = &'a SessionRecord>,
    F: FnMut(&mut V, &'a SessionRecord),
{
    let mut buckets: BTreeMap<NaiveDate, V> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(week_closing(record.login_day()))
            .or_insert_with(|| zero.clone());
        add(entry, record);
    }

    let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut series = Vec::new();
    let mut week = first;
    while week <= last {
        let value = buckets.remove(&week).unwrap_or_else(|| zero.clone());
        series.push((week, value));
        week += Duration::days(7);
    }
    series
}

/// Groups records by calendar login date, ascending. No gap filling.
pub fn bucket_daily<'a, V, I, F>(records: I, zero: V, mut add: F) -> Vec<(NaiveDate, V)>
where
    V: Clone,
    I: IntoIterator<Item = &'a SessionRecord>,
    F: FnMut(&mut V, &'a SessionRecord),
{
    let mut buckets: BTreeMap<NaiveDate, V> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(record.login_day())
            .or_insert_with(|| zero.clone());
        add(entry, record);
    }
    buckets.into_iter().collect()
}

/// Fractional change from the previous value. `None` for the first element.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        if index == 0 {
            changes.push(None);
        } else {
            changes.push(Some(value / values[index - 1] - 1.0));
        }
    }
    changes
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn session(customer: &str, login: NaiveDateTime) -> SessionRecord {
        SessionRecord {
            customer_id: customer.to_string(),
            login_date: login,
            session_duration: 600.0,
            inactive_duration: 60.0,
            session_projects_added: 0,
            session_likes_given: 0,
            session_comments_given: 0,
            bugs_in_session: 0,
        }
    }

    pub(crate) fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn monday_closes_its_own_week() {
        // 2018-10-01 is a Monday.
        assert_eq!(week_closing(day(2018, 10, 1)), day(2018, 10, 1));
        assert_eq!(week_closing(day(2018, 10, 2)), day(2018, 10, 8));
        assert_eq!(week_closing(day(2018, 10, 7)), day(2018, 10, 8));
        assert_eq!(week_opening(day(2018, 10, 8)), day(2018, 10, 2));
    }

    #[test]
    fn late_monday_login_stays_in_closing_week() {
        let records = vec![session("a", at(2018, 10, 1, 23))];
        let series = bucket_weekly(&records, 0u64, |count, _| *count += 1);
        assert_eq!(series, vec![(day(2018, 10, 1), 1)]);
    }

    #[test]
    fn empty_weeks_are_filled_with_zero() {
        let records = vec![
            session("a", at(2018, 10, 3, 9)),
            session("b", at(2018, 10, 24, 9)),
        ];
        let series = bucket_weekly(&records, 0u64, |count, _| *count += 1);
        assert_eq!(
            series,
            vec![
                (day(2018, 10, 8), 1),
                (day(2018, 10, 15), 0),
                (day(2018, 10, 22), 0),
                (day(2018, 10, 29), 1),
            ]
        );
    }

    #[test]
    fn no_records_means_no_buckets() {
        let records: Vec<SessionRecord> = Vec::new();
        assert!(bucket_weekly(&records, 0u64, |count, _| *count += 1).is_empty());
        assert!(bucket_daily(&records, 0u64, |count, _| *count += 1).is_empty());
    }

    #[test]
    fn daily_buckets_are_sorted_by_date() {
        let records = vec![
            session("a", at(2018, 10, 5, 9)),
            session("b", at(2018, 10, 3, 9)),
            session("c", at(2018, 10, 5, 18)),
        ];
        let series = bucket_daily(&records, 0u64, |count, _| *count += 1);
        assert_eq!(series, vec![(day(2018, 10, 3), 1), (day(2018, 10, 5), 2)]);
    }

    #[test]
    fn pct_change_matches_ratio_minus_one() {
        let changes = pct_change(&[4.0, 6.0, 3.0, 0.0, 2.0]);
        assert_eq!(changes[0], None);
        assert!((changes[1].unwrap() - 0.5).abs() < 1e-12);
        assert!((changes[2].unwrap() + 0.5).abs() < 1e-12);
        assert!((changes[3].unwrap() + 1.0).abs() < 1e-12);
        assert!(changes[4].unwrap().is_infinite());
    }
}
