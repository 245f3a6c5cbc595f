//! Report repository
//!
//! Point queries against `oracle_reports`, always keyed by
//! `(db_name, report_id)`. JSON payload columns are stored as text and decoded
//! here; a NULL list column reads as an empty list.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateReportInput, Report, ReportStatus, ReportSummary, ThinkingStep};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const REPORT_COLUMNS: &str = "report_id, db_name, report_name, status, created_ts, inputs, mdx, \
     tiptap_mdx, analyses, analysis_ids, thinking_steps, report_content_with_citations, comments";

const SUMMARY_COLUMNS: &str = "report_id, report_name, status, created_ts, inputs";

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a new report row
    async fn create(&self, input: &CreateReportInput) -> Result<Report>;

    /// Fetch a full report
    async fn get(&self, db_name: &str, report_id: i64) -> Result<Option<Report>>;

    /// All reports of a database, newest first
    async fn list_by_db(&self, db_name: &str) -> Result<Vec<ReportSummary>>;

    /// Delete a report. Returns false when no row matched.
    async fn delete(&self, db_name: &str, report_id: i64) -> Result<bool>;

    /// Replace the comments list. Returns false when no row matched.
    async fn update_comments(&self, db_name: &str, report_id: i64, comments: &[Value])
        -> Result<bool>;

    /// Overwrite whichever markup fields are given. Returns false when no row matched.
    async fn update_mdx(
        &self,
        db_name: &str,
        report_id: i64,
        mdx: Option<&str>,
        tiptap_mdx: Option<&str>,
    ) -> Result<bool>;
}

pub struct SqlxReportRepository {
    pool: DynDatabasePool,
}

impl SqlxReportRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReportRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReportRepository for SqlxReportRepository {
    async fn create(&self, input: &CreateReportInput) -> Result<Report> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get(&self, db_name: &str, report_id: i64) -> Result<Option<Report>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_sqlite(self.pool.sqlite()?, db_name, report_id).await,
            DatabaseDriver::Mysql => get_mysql(self.pool.mysql()?, db_name, report_id).await,
        }
    }

    async fn list_by_db(&self, db_name: &str) -> Result<Vec<ReportSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_db_sqlite(self.pool.sqlite()?, db_name).await,
            DatabaseDriver::Mysql => list_by_db_mysql(self.pool.mysql()?, db_name).await,
        }
    }

    async fn delete(&self, db_name: &str, report_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.sqlite()?, db_name, report_id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.mysql()?, db_name, report_id).await,
        }
    }

    async fn update_comments(
        &self,
        db_name: &str,
        report_id: i64,
        comments: &[Value],
    ) -> Result<bool> {
        let encoded = encode_json(&comments, "comments")?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_comments_sqlite(self.pool.sqlite()?, db_name, report_id, &encoded).await
            }
            DatabaseDriver::Mysql => {
                update_comments_mysql(self.pool.mysql()?, db_name, report_id, &encoded).await
            }
        }
    }

    async fn update_mdx(
        &self,
        db_name: &str,
        report_id: i64,
        mdx: Option<&str>,
        tiptap_mdx: Option<&str>,
    ) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_mdx_sqlite(self.pool.sqlite()?, db_name, report_id, mdx, tiptap_mdx).await
            }
            DatabaseDriver::Mysql => {
                update_mdx_mysql(self.pool.mysql()?, db_name, report_id, mdx, tiptap_mdx).await
            }
        }
    }
}

// ============================================================================
// Row decoding shared by both backends
// ============================================================================

/// Column values as read from either backend, before JSON decoding
struct RawReport {
    report_id: i64,
    db_name: String,
    report_name: Option<String>,
    status: String,
    created_ts: DateTime<Utc>,
    inputs: Option<String>,
    mdx: Option<String>,
    tiptap_mdx: Option<String>,
    analyses: Option<String>,
    analysis_ids: Option<String>,
    thinking_steps: Option<String>,
    report_content_with_citations: Option<String>,
    comments: Option<String>,
}

impl RawReport {
    /// Decode the JSON columns.
    ///
    /// Decoding is per column and per element: a malformed value is logged and
    /// read as empty so the remaining fields stay readable.
    fn into_report(self) -> Report {
        let id = self.report_id;
        let thinking_steps = decode_json_list(id, "thinking_steps", self.thinking_steps.as_deref())
            .into_iter()
            .filter_map(|step| match serde_json::from_value::<ThinkingStep>(step) {
                Ok(step) => Some(step),
                Err(e) => {
                    tracing::warn!(report_id = id, "Skipping malformed thinking step: {}", e);
                    None
                }
            })
            .collect();

        Report {
            report_id: id,
            db_name: self.db_name,
            report_name: self.report_name,
            status: ReportStatus::from(self.status),
            created_ts: self.created_ts,
            inputs: decode_json_value(id, "inputs", self.inputs.as_deref()),
            mdx: self.mdx,
            tiptap_mdx: self.tiptap_mdx,
            analyses: decode_json_list(id, "analyses", self.analyses.as_deref()),
            analysis_ids: decode_json_list(id, "analysis_ids", self.analysis_ids.as_deref()),
            thinking_steps,
            report_content_with_citations: decode_json_list(
                id,
                "report_content_with_citations",
                self.report_content_with_citations.as_deref(),
            ),
            comments: decode_json_list(id, "comments", self.comments.as_deref()),
        }
    }
}

fn decode_json_value(report_id: i64, column: &str, raw: Option<&str>) -> Value {
    match raw {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str(text).unwrap_or_else(|e| {
                tracing::warn!(report_id, column, "Invalid JSON in report column: {}", e);
                Value::Null
            })
        }
        _ => Value::Null,
    }
}

/// A NULL or non-list column reads as an empty list
fn decode_json_list(report_id: i64, column: &str, raw: Option<&str>) -> Vec<Value> {
    match decode_json_value(report_id, column, raw) {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        _ => {
            tracing::warn!(report_id, column, "Expected a JSON list in report column");
            Vec::new()
        }
    }
}

fn encode_json<T: Serialize + ?Sized>(value: &T, column: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("Failed to encode {}", column))
}

/// Encoded column values for an insert
struct EncodedReport {
    created_ts: DateTime<Utc>,
    inputs: String,
    analyses: String,
    analysis_ids: String,
    thinking_steps: String,
    report_content_with_citations: String,
    comments: String,
}

impl EncodedReport {
    fn from_input(input: &CreateReportInput) -> Result<Self> {
        Ok(Self {
            created_ts: input.created_ts.unwrap_or_else(Utc::now),
            inputs: encode_json(&input.inputs, "inputs")?,
            analyses: encode_json(&input.analyses, "analyses")?,
            analysis_ids: encode_json(&input.analysis_ids, "analysis_ids")?,
            thinking_steps: encode_json(&input.thinking_steps, "thinking_steps")?,
            report_content_with_citations: encode_json(
                &input.report_content_with_citations,
                "report_content_with_citations",
            )?,
            comments: "[]".to_string(),
        })
    }

    fn into_report(self, report_id: i64, input: &CreateReportInput) -> Report {
        Report {
            report_id,
            db_name: input.db_name.clone(),
            report_name: input.report_name.clone(),
            status: input.status.clone(),
            created_ts: self.created_ts,
            inputs: input.inputs.clone(),
            mdx: input.mdx.clone(),
            tiptap_mdx: None,
            analyses: input.analyses.clone(),
            analysis_ids: input.analysis_ids.iter().cloned().map(Value::String).collect(),
            thinking_steps: input.thinking_steps.clone(),
            report_content_with_citations: input.report_content_with_citations.clone(),
            comments: Vec::new(),
        }
    }
}

const INSERT_REPORT: &str = "INSERT INTO oracle_reports (db_name, report_name, status, created_ts, \
     inputs, mdx, analyses, analysis_ids, thinking_steps, report_content_with_citations, comments) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, input: &CreateReportInput) -> Result<Report> {
    let encoded = EncodedReport::from_input(input)?;
    let result = sqlx::query(INSERT_REPORT)
        .bind(&input.db_name)
        .bind(&input.report_name)
        .bind(input.status.to_string())
        .bind(encoded.created_ts)
        .bind(&encoded.inputs)
        .bind(&input.mdx)
        .bind(&encoded.analyses)
        .bind(&encoded.analysis_ids)
        .bind(&encoded.thinking_steps)
        .bind(&encoded.report_content_with_citations)
        .bind(&encoded.comments)
        .execute(pool)
        .await
        .context("Failed to create report")?;

    Ok(encoded.into_report(result.last_insert_rowid(), input))
}

async fn get_sqlite(pool: &SqlitePool, db_name: &str, report_id: i64) -> Result<Option<Report>> {
    let sql = format!(
        "SELECT {} FROM oracle_reports WHERE db_name = ? AND report_id = ?",
        REPORT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(db_name)
        .bind(report_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get report")?;
    Ok(row.map(|r| row_to_report_sqlite(&r)))
}

async fn list_by_db_sqlite(pool: &SqlitePool, db_name: &str) -> Result<Vec<ReportSummary>> {
    // Rows may hold RFC 3339 or "YYYY-MM-DD HH:MM:SS" text; compare as instants
    let sql = format!(
        "SELECT {} FROM oracle_reports WHERE db_name = ? \
         ORDER BY julianday(created_ts) DESC, report_id DESC",
        SUMMARY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(db_name)
        .fetch_all(pool)
        .await
        .context("Failed to list reports")?;
    Ok(rows.iter().map(row_to_summary_sqlite).collect())
}

async fn delete_sqlite(pool: &SqlitePool, db_name: &str, report_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM oracle_reports WHERE db_name = ? AND report_id = ?")
        .bind(db_name)
        .bind(report_id)
        .execute(pool)
        .await
        .context("Failed to delete report")?;
    Ok(result.rows_affected() > 0)
}

async fn exists_sqlite(
    conn: &mut sqlx::SqliteConnection,
    db_name: &str,
    report_id: i64,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM oracle_reports WHERE db_name = ? AND report_id = ?",
    )
    .bind(db_name)
    .bind(report_id)
    .fetch_one(conn)
    .await?;
    Ok(row.get::<i64, _>("count") > 0)
}

async fn update_comments_sqlite(
    pool: &SqlitePool,
    db_name: &str,
    report_id: i64,
    comments: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    if !exists_sqlite(&mut tx, db_name, report_id).await? {
        return Ok(false);
    }
    sqlx::query("UPDATE oracle_reports SET comments = ? WHERE db_name = ? AND report_id = ?")
        .bind(comments)
        .bind(db_name)
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update report comments")?;
    tx.commit().await?;
    Ok(true)
}

async fn update_mdx_sqlite(
    pool: &SqlitePool,
    db_name: &str,
    report_id: i64,
    mdx: Option<&str>,
    tiptap_mdx: Option<&str>,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    if !exists_sqlite(&mut tx, db_name, report_id).await? {
        return Ok(false);
    }
    sqlx::query(
        "UPDATE oracle_reports SET mdx = COALESCE(?, mdx), tiptap_mdx = COALESCE(?, tiptap_mdx) \
         WHERE db_name = ? AND report_id = ?",
    )
    .bind(mdx)
    .bind(tiptap_mdx)
    .bind(db_name)
    .bind(report_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update report markup")?;
    tx.commit().await?;
    Ok(true)
}

fn row_to_report_sqlite(row: &sqlx::sqlite::SqliteRow) -> Report {
    RawReport {
        report_id: row.get("report_id"),
        db_name: row.get("db_name"),
        report_name: row.get("report_name"),
        status: row.get("status"),
        created_ts: row.get("created_ts"),
        inputs: row.get("inputs"),
        mdx: row.get("mdx"),
        tiptap_mdx: row.get("tiptap_mdx"),
        analyses: row.get("analyses"),
        analysis_ids: row.get("analysis_ids"),
        thinking_steps: row.get("thinking_steps"),
        report_content_with_citations: row.get("report_content_with_citations"),
        comments: row.get("comments"),
    }
    .into_report()
}

fn row_to_summary_sqlite(row: &sqlx::sqlite::SqliteRow) -> ReportSummary {
    let report_id: i64 = row.get("report_id");
    let status: String = row.get("status");
    let inputs: Option<String> = row.get("inputs");
    ReportSummary {
        report_id,
        report_name: row.get("report_name"),
        status: ReportStatus::from(status),
        created_ts: row.get("created_ts"),
        inputs: decode_json_value(report_id, "inputs", inputs.as_deref()),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, input: &CreateReportInput) -> Result<Report> {
    let encoded = EncodedReport::from_input(input)?;
    let result = sqlx::query(INSERT_REPORT)
        .bind(&input.db_name)
        .bind(&input.report_name)
        .bind(input.status.to_string())
        .bind(encoded.created_ts)
        .bind(&encoded.inputs)
        .bind(&input.mdx)
        .bind(&encoded.analyses)
        .bind(&encoded.analysis_ids)
        .bind(&encoded.thinking_steps)
        .bind(&encoded.report_content_with_citations)
        .bind(&encoded.comments)
        .execute(pool)
        .await
        .context("Failed to create report")?;

    Ok(encoded.into_report(result.last_insert_id() as i64, input))
}

async fn get_mysql(pool: &MySqlPool, db_name: &str, report_id: i64) -> Result<Option<Report>> {
    let sql = format!(
        "SELECT {} FROM oracle_reports WHERE db_name = ? AND report_id = ?",
        REPORT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(db_name)
        .bind(report_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get report")?;
    Ok(row.map(|r| row_to_report_mysql(&r)))
}

async fn list_by_db_mysql(pool: &MySqlPool, db_name: &str) -> Result<Vec<ReportSummary>> {
    let sql = format!(
        "SELECT {} FROM oracle_reports WHERE db_name = ? ORDER BY created_ts DESC, report_id DESC",
        SUMMARY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(db_name)
        .fetch_all(pool)
        .await
        .context("Failed to list reports")?;
    Ok(rows.iter().map(row_to_summary_mysql).collect())
}

async fn delete_mysql(pool: &MySqlPool, db_name: &str, report_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM oracle_reports WHERE db_name = ? AND report_id = ?")
        .bind(db_name)
        .bind(report_id)
        .execute(pool)
        .await
        .context("Failed to delete report")?;
    Ok(result.rows_affected() > 0)
}

// MySQL reports zero affected rows for a no-op UPDATE, so existence is checked first.
async fn exists_mysql(
    conn: &mut sqlx::MySqlConnection,
    db_name: &str,
    report_id: i64,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM oracle_reports WHERE db_name = ? AND report_id = ?",
    )
    .bind(db_name)
    .bind(report_id)
    .fetch_one(conn)
    .await?;
    Ok(row.get::<i64, _>("count") > 0)
}

async fn update_comments_mysql(
    pool: &MySqlPool,
    db_name: &str,
    report_id: i64,
    comments: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    if !exists_mysql(&mut tx, db_name, report_id).await? {
        return Ok(false);
    }
    sqlx::query("UPDATE oracle_reports SET comments = ? WHERE db_name = ? AND report_id = ?")
        .bind(comments)
        .bind(db_name)
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update report comments")?;
    tx.commit().await?;
    Ok(true)
}

async fn update_mdx_mysql(
    pool: &MySqlPool,
    db_name: &str,
    report_id: i64,
    mdx: Option<&str>,
    tiptap_mdx: Option<&str>,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    if !exists_mysql(&mut tx, db_name, report_id).await? {
        return Ok(false);
    }
    sqlx::query(
        "UPDATE oracle_reports SET mdx = COALESCE(?, mdx), tiptap_mdx = COALESCE(?, tiptap_mdx) \
         WHERE db_name = ? AND report_id = ?",
    )
    .bind(mdx)
    .bind(tiptap_mdx)
    .bind(db_name)
    .bind(report_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update report markup")?;
    tx.commit().await?;
    Ok(true)
}

fn row_to_report_mysql(row: &sqlx::mysql::MySqlRow) -> Report {
    RawReport {
        report_id: row.get("report_id"),
        db_name: row.get("db_name"),
        report_name: row.get("report_name"),
        status: row.get("status"),
        created_ts: row.get("created_ts"),
        inputs: row.get("inputs"),
        mdx: row.get("mdx"),
        tiptap_mdx: row.get("tiptap_mdx"),
        analyses: row.get("analyses"),
        analysis_ids: row.get("analysis_ids"),
        thinking_steps: row.get("thinking_steps"),
        report_content_with_citations: row.get("report_content_with_citations"),
        comments: row.get("comments"),
    }
    .into_report()
}

fn row_to_summary_mysql(row: &sqlx::mysql::MySqlRow) -> ReportSummary {
    let report_id: i64 = row.get("report_id");
    let status: String = row.get("status");
    let inputs: Option<String> = row.get("inputs");
    ReportSummary {
        report_id,
        report_name: row.get("report_name"),
        status: ReportStatus::from(status),
        created_ts: row.get("created_ts"),
        inputs: decode_json_value(report_id, "inputs", inputs.as_deref()),
    }
}
