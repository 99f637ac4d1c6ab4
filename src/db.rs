use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{SessionDataset, SessionRecord};
use crate::source;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Key that makes re-importing the same export a no-op.
pub fn source_key(record: &SessionRecord) -> String {
    format!(
        "{}@{}",
        record.customer_id,
        record.login_date.format("%Y-%m-%dT%H:%M:%S%.f")
    )
}

async fn insert_session(pool: &PgPool, record: &SessionRecord) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO weekly_engagement.sessions
        (id, customer_id, login_date, session_duration, inactive_duration,
         session_projects_added, session_likes_given, session_comments_given,
         bugs_in_session, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.customer_id)
    .bind(record.login_date)
    .bind(record.session_duration)
    .bind(record.inactive_duration)
    .bind(to_column(record.session_projects_added)?)
    .bind(to_column(record.session_likes_given)?)
    .bind(to_column(record.session_comments_given)?)
    .bind(to_column(record.bugs_in_session)?)
    .bind(source_key(record))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn to_column(count: u32) -> anyhow::Result<i32> {
    i32::try_from(count).with_context(|| format!("count {count} does not fit an INTEGER column"))
}

fn from_column(row: &PgRow, column: &str) -> anyhow::Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).with_context(|| format!("negative {column} in stored session"))
}

pub fn seed_sessions() -> anyhow::Result<Vec<SessionRecord>> {
    let customers = [
        Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
        Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
        Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
    ];

    // (customer, day of October 2018, hour, duration, inactive, projects, likes, comments, bugs)
    let rows = [
        (0, 2, 9, 1_800.0, 120.0, 1, 4, 2, 0),
        (1, 3, 14, 2_400.0, 300.0, 2, 6, 5, 1),
        (0, 9, 10, 1_200.0, 1_500.0, 0, 1, 1, 0),
        (2, 10, 16, 3_600.0, 200.0, 3, 9, 8, 2),
        (1, 16, 11, 900.0, 60.0, 1, 2, 4, 1),
        (2, 23, 8, 2_700.0, 400.0, 2, 5, 2, 3),
        (0, 30, 12, 600.0, 30.0, 0, 1, 0, 0),
    ];

    let mut sessions = Vec::with_capacity(rows.len());
    for (customer, day, hour, duration, inactive, projects, likes, comments, bugs) in rows {
        let login_date: NaiveDateTime = NaiveDate::from_ymd_opt(2018, 10, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .context("invalid date")?;
        sessions.push(SessionRecord {
            customer_id: customers[customer].to_string(),
            login_date,
            session_duration: duration,
            inactive_duration: inactive,
            session_projects_added: projects,
            session_likes_given: likes,
            session_comments_given: comments,
            bugs_in_session: bugs,
        });
    }
    Ok(sessions)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for record in seed_sessions()? {
        if insert_session(pool, &record).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub async fn fetch_sessions(
    pool: &PgPool,
    since_date: Option<NaiveDate>,
) -> anyhow::Result<SessionDataset> {
    let mut query = String::from(
        "SELECT customer_id, login_date, session_duration, inactive_duration, \
         session_projects_added, session_likes_given, session_comments_given, bugs_in_session \
         FROM weekly_engagement.sessions",
    );

    if since_date.is_some() {
        query.push_str(" WHERE login_date >= $1");
    }
    query.push_str(" ORDER BY login_date, source_key");

    let mut rows = sqlx::query(&query);
    if let Some(since) = since_date {
        rows = rows.bind(since.and_hms_opt(0, 0, 0).context("invalid since date")?);
    }

    let records = rows.fetch_all(pool).await?;
    let mut sessions = Vec::with_capacity(records.len());

    for row in records {
        sessions.push(SessionRecord {
            customer_id: row.try_get("customer_id")?,
            login_date: row.try_get("login_date")?,
            session_duration: row.try_get("session_duration")?,
            inactive_duration: row.try_get("inactive_duration")?,
            session_projects_added: from_column(&row, "session_projects_added")?,
            session_likes_given: from_column(&row, "session_likes_given")?,
            session_comments_given: from_column(&row, "session_comments_given")?,
            bugs_in_session: from_column(&row, "bugs_in_session")?,
        });
    }

    debug!(sessions = sessions.len(), since = ?since_date, "fetched sessions");
    Ok(SessionDataset::new(sessions))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let dataset = source::load_csv(csv_path)?;
    let mut inserted = 0usize;

    for record in dataset.records() {
        if insert_session(pool, record).await? {
            inserted += 1;
        }
    }

    info!(
        path = %csv_path.display(),
        read = dataset.len(),
        inserted,
        "imported sessions"
    );
    Ok(inserted)
}
