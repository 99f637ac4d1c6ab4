use chrono::Datelike;
use tracing::info;

use crate::analytics::WeeklyAnalyticsReport;
use crate::chart::{Chart, ChartKind, ChartSurface, Mark, Series, ValueFormat};
use crate::models::{
    ActiveSessions, BugCorrelation, DailyDuration, UserBreakdown, VariationRow, WeeklyCount,
    WeeklyEngagement,
};

fn weekly_count_chart(title: &str, weeks: &[WeeklyCount]) -> Chart {
    Chart::new(title, ChartKind::Bar, "Date", "Number of Sessions")
        .categories(weeks.iter().map(|w| w.week))
        .series(Series::new(
            "Active_Sessions",
            Mark::Bar,
            ValueFormat::Count,
            weeks.iter().map(|w| w.sessions as f64).collect(),
        ))
}

pub fn active_sessions_charts(active: &ActiveSessions) -> [Chart; 2] {
    [
        weekly_count_chart("Active Sessions per week", &active.all),
        weekly_count_chart("Active Sessions excluding incorrect data per week", &active.valid),
    ]
}

pub fn unique_vs_returning_chart(weeks: &[UserBreakdown]) -> Chart {
    Chart::new(
        "New Users VS Returning Users Breakdown",
        ChartKind::StackedBar,
        "Date",
        "Number of Sessions",
    )
    .categories(weeks.iter().map(|w| w.week))
    .series(Series::new(
        "unique_users",
        Mark::Bar,
        ValueFormat::Count,
        weeks.iter().map(|w| w.unique as f64).collect(),
    ))
    .series(Series::new(
        "returning_users",
        Mark::Bar,
        ValueFormat::Count,
        weeks.iter().map(|w| w.returning as f64).collect(),
    ))
}

pub fn events_engagement_chart(weeks: &[WeeklyEngagement]) -> Chart {
    let line =
        |name: &str, values: Vec<f64>| Series::new(name, Mark::Line, ValueFormat::Count, values);
    Chart::new("Events Engagement", ChartKind::Line, "Date", "Events Count")
        .categories(weeks.iter().map(|w| w.week))
        .series(line("Likes", weeks.iter().map(|w| w.likes as f64).collect()))
        .series(line("Projects", weeks.iter().map(|w| w.projects as f64).collect()))
        .series(line("Comments", weeks.iter().map(|w| w.comments as f64).collect()))
}

pub fn percentage_variation_chart(rows: &[VariationRow]) -> Chart {
    let bar =
        |name: &str, values: Vec<f64>| Series::new(name, Mark::Bar, ValueFormat::Percent, values);
    Chart::new("Event Engagement", ChartKind::GroupedBar, "Week", "Percentage Variation")
        .categories(rows.iter().map(|r| r.week))
        .series(bar("Projects", rows.iter().map(|r| r.projects).collect()))
        .series(bar("Likes", rows.iter().map(|r| r.likes).collect()))
        .series(bar("Comments", rows.iter().map(|r| r.comments).collect()))
}

/// Bars and line share the bug series' weeks. The first bug week has no
/// comment variation and shows as a gap.
pub fn source_of_bugs_chart(correlation: &BugCorrelation) -> Chart {
    let comments = correlation
        .bugs
        .iter()
        .map(|bugs| {
            correlation
                .comment_variation
                .iter()
                .find(|row| row.week == bugs.week)
                .map_or(f64::NAN, |row| row.comments)
        })
        .collect();

    Chart::new(
        "Bugs VS Comments Percentage Variation",
        ChartKind::Combo,
        "Week",
        "Comments Variation in Percentage",
    )
    .secondary_label("Number of Bugs")
    .categories(correlation.bugs.iter().map(|w| w.week))
    .series(Series::new("Comments", Mark::Bar, ValueFormat::Percent, comments))
    .series(
        Series::new(
            "Bugs",
            Mark::Line,
            ValueFormat::Count,
            correlation.bugs.iter().map(|w| w.bugs as f64).collect(),
        )
        .on_secondary_axis(),
    )
}

pub fn average_session_duration_chart(days: &[DailyDuration]) -> Chart {
    Chart::new(
        "Average Session Duration per Day",
        ChartKind::Line,
        "Days",
        "Average Session time in minutes",
    )
    .categories(days.iter().map(|d| d.date.day()))
    .series(Series::new(
        "session_duration",
        Mark::Line,
        ValueFormat::Minutes,
        days.iter().map(|d| d.minutes).collect(),
    ))
}

pub fn active_sessions(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    for chart in active_sessions_charts(&report.active_sessions()) {
        surface.draw(&chart)?;
    }
    Ok(())
}

pub fn unique_vs_returning_users(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    surface.draw(&unique_vs_returning_chart(&report.unique_vs_returning_users()))
}

pub fn events_engagement(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    surface.draw(&events_engagement_chart(&report.events_engagement()))
}

pub fn events_engagement_percentage_variation(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    surface.draw(&percentage_variation_chart(&report.percent_variation()))
}

pub fn source_of_bugs(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    surface.draw(&source_of_bugs_chart(&report.source_of_bugs()))
}

pub fn average_session_duration(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    surface.draw(&average_session_duration_chart(&report.average_session_duration()))
}

pub fn render_all(
    report: &WeeklyAnalyticsReport,
    surface: &mut dyn ChartSurface,
) -> anyhow::Result<()> {
    active_sessions(report, surface)?;
    unique_vs_returning_users(report, surface)?;
    events_engagement(report, surface)?;
    events_engagement_percentage_variation(report, surface)?;
    source_of_bugs(report, surface)?;
    average_session_duration(report, surface)?;
    info!(
        trim_trailing_week = report.options().trim_trailing_week,
        "rendered weekly engagement report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::tests::{at, day, session};
    use crate::chart::{Axis, JsonSurface, MarkdownSurface};
    use crate::models::{SessionDataset, SessionRecord, WeeklyBugs};

    fn dataset() -> SessionDataset {
        let commented = |customer: &str, login, comments, bugs| SessionRecord {
            session_comments_given: comments,
            bugs_in_session: bugs,
            ..session(customer, login)
        };
        SessionDataset::new(vec![
            commented("c1", at(2018, 10, 2, 9), 4, 1),
            commented("c2", at(2018, 10, 9, 9), 6, 2),
            commented("c1", at(2018, 10, 16, 9), 3, 5),
            commented("c3", at(2018, 10, 23, 9), 3, 0),
        ])
    }

    #[test]
    fn render_all_draws_every_chart_in_order() {
        let data = dataset();
        let report = WeeklyAnalyticsReport::new(&data);
        let mut surface = JsonSurface::new();
        render_all(&report, &mut surface).unwrap();

        let titles: Vec<&str> = surface.charts().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Active Sessions per week",
                "Active Sessions excluding incorrect data per week",
                "New Users VS Returning Users Breakdown",
                "Events Engagement",
                "Event Engagement",
                "Bugs VS Comments Percentage Variation",
                "Average Session Duration per Day",
            ]
        );
    }

    #[test]
    fn bug_chart_aligns_variation_with_bug_weeks() {
        let data = dataset();
        let chart = source_of_bugs_chart(&WeeklyAnalyticsReport::new(&data).source_of_bugs());

        assert_eq!(chart.categories, vec!["2018-10-08", "2018-10-15", "2018-10-22"]);
        let comments = &chart.series[0].values;
        assert!(comments[0].is_nan());
        assert!((comments[1] - 0.5).abs() < 1e-9);
        assert!((comments[2] + 0.5).abs() < 1e-9);
        assert_eq!(chart.series[1].values, vec![1.0, 2.0, 5.0]);
        assert_eq!(chart.series[1].axis, Axis::Secondary);
    }

    #[test]
    fn bug_chart_handles_missing_variation() {
        let correlation = BugCorrelation {
            comment_variation: Vec::new(),
            bugs: vec![WeeklyBugs { week: day(2018, 10, 8), bugs: 2 }],
        };
        let chart = source_of_bugs_chart(&correlation);
        assert_eq!(chart.categories.len(), 1);
        assert!(chart.series[0].values[0].is_nan());
    }

    #[test]
    fn duration_chart_is_keyed_by_day_of_month() {
        let chart = average_session_duration_chart(&[
            DailyDuration { date: day(2018, 10, 2), minutes: 10.0 },
            DailyDuration { date: day(2018, 10, 9), minutes: 7.5 },
        ]);
        assert_eq!(chart.categories, vec!["2", "9"]);
        assert_eq!(chart.series[0].values, vec![10.0, 7.5]);
    }

    #[test]
    fn variation_renders_as_percentages_in_markdown() {
        let data = dataset();
        let report = WeeklyAnalyticsReport::new(&data);
        let mut surface = MarkdownSurface::new("Weekly Engagement Report");
        events_engagement_percentage_variation(&report, &mut surface).unwrap();
        let output = surface.into_string();

        assert!(output.contains("| Week | Projects | Likes | Comments |"));
        assert!(output.contains("| 2018-10-15 | n/a | n/a | 50.00% |"));
    }

    #[test]
    fn empty_dataset_renders_empty_charts() {
        let data = SessionDataset::default();
        let report = WeeklyAnalyticsReport::new(&data);
        let mut surface = JsonSurface::new();
        render_all(&report, &mut surface).unwrap();
        assert_eq!(surface.charts().len(), 7);
        assert!(surface.charts().iter().all(|c| c.categories.is_empty()));
    }
}
