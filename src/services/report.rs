//! Report service
//!
//! Read and annotate stored reports:
//! - List a database's reports, hiding revision snapshots
//! - Delete a report and abort its generation task
//! - Project content, status, analysis ids and comments
//! - Overwrite comments and markup

use crate::db::repositories::ReportRepository;
use crate::models::{ReportStatus, ReportSummary, ThinkingStep};
use crate::services::tasks::ReportTasks;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;

/// Error types for report service operations
#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    /// No row for the (db_name, report_id) pair
    #[error("Report not found")]
    NotFound,

    /// The report exists but the requested analysis does not
    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Content projection returned by [`ReportService::get_content`]
#[derive(Debug, Clone)]
pub struct ReportContent {
    pub mdx: Option<String>,
    pub analyses: Vec<Value>,
    pub report_with_citations: Vec<Value>,
    pub inputs: Value,
}

/// Drop revision snapshots from a listing, keeping order
pub fn visible_reports(reports: Vec<ReportSummary>) -> Vec<ReportSummary> {
    reports
        .into_iter()
        .filter(|r| !r.status.is_revision())
        .collect()
}

/// Stored analyses followed by every non-SQL thinking step.
///
/// SQL-answer steps are skipped since their outputs are already stored as
/// analyses. Each kept step is tagged with the analysis id found in its
/// result, or `"unknown"`.
pub fn merge_analyses(analyses: Vec<Value>, thinking_steps: Vec<ThinkingStep>) -> Vec<Value> {
    let mut merged = analyses;
    for mut step in thinking_steps.into_iter().filter(|s| !s.is_sql_answer()) {
        step.analysis_id = Some(Value::String(step.result_analysis_id()));
        match serde_json::to_value(&step) {
            Ok(value) => merged.push(value),
            Err(e) => tracing::warn!("Skipping unserializable thinking step: {}", e),
        }
    }
    merged
}

pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    tasks: Arc<ReportTasks>,
}

impl ReportService {
    pub fn new(repo: Arc<dyn ReportRepository>, tasks: Arc<ReportTasks>) -> Self {
        Self { repo, tasks }
    }

    /// Registry the generation pipeline registers its tasks with
    pub fn tasks(&self) -> &Arc<ReportTasks> {
        &self.tasks
    }

    /// Reports of a database, newest first, without revision snapshots
    pub async fn list_reports(
        &self,
        db_name: &str,
    ) -> Result<Vec<ReportSummary>, ReportServiceError> {
        let reports = self
            .repo
            .list_by_db(db_name)
            .await
            .context("Failed to list reports")?;
        Ok(visible_reports(reports))
    }

    /// Delete a report and abort its in-progress generation, if any
    pub async fn delete_report(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<(), ReportServiceError> {
        let deleted = self
            .repo
            .delete(db_name, report_id)
            .await
            .context("Failed to delete report")?;
        if !deleted {
            return Err(ReportServiceError::NotFound);
        }

        tracing::info!(db_name, report_id, "Report deleted");
        if self.tasks.cancel(db_name, report_id).await {
            tracing::info!(db_name, report_id, "Cancelled report generation task");
        }
        Ok(())
    }

    pub async fn get_content(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<ReportContent, ReportServiceError> {
        let report = self.fetch(db_name, report_id).await?;
        Ok(ReportContent {
            mdx: report.mdx,
            analyses: merge_analyses(report.analyses, report.thinking_steps),
            report_with_citations: report.report_content_with_citations,
            inputs: report.inputs,
        })
    }

    /// One entry of the merged analyses list, matched on `analysis_id`
    pub async fn get_analysis(
        &self,
        db_name: &str,
        report_id: i64,
        analysis_id: &str,
    ) -> Result<Value, ReportServiceError> {
        let content = self.get_content(db_name, report_id).await?;
        content
            .analyses
            .into_iter()
            .find(|a| a.get("analysis_id").and_then(Value::as_str) == Some(analysis_id))
            .ok_or_else(|| ReportServiceError::AnalysisNotFound(analysis_id.to_string()))
    }

    pub async fn get_analysis_ids(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<Vec<Value>, ReportServiceError> {
        Ok(self.fetch(db_name, report_id).await?.analysis_ids)
    }

    pub async fn get_status(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<ReportStatus, ReportServiceError> {
        Ok(self.fetch(db_name, report_id).await?.status)
    }

    pub async fn get_comments(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<Vec<Value>, ReportServiceError> {
        Ok(self.fetch(db_name, report_id).await?.comments)
    }

    /// Replace the comments list exactly
    pub async fn update_comments(
        &self,
        db_name: &str,
        report_id: i64,
        comments: &[Value],
    ) -> Result<(), ReportServiceError> {
        let updated = self
            .repo
            .update_comments(db_name, report_id, comments)
            .await
            .context("Failed to update report comments")?;
        if !updated {
            return Err(ReportServiceError::NotFound);
        }
        tracing::debug!(db_name, report_id, count = comments.len(), "Comments updated");
        Ok(())
    }

    /// Overwrite the generated and/or edited markup
    pub async fn update_mdx(
        &self,
        db_name: &str,
        report_id: i64,
        mdx: Option<&str>,
        tiptap_mdx: Option<&str>,
    ) -> Result<(), ReportServiceError> {
        if mdx.is_none() && tiptap_mdx.is_none() {
            return Err(ReportServiceError::ValidationError(
                "Either mdx or tiptap_mdx must be provided".to_string(),
            ));
        }

        let updated = self
            .repo
            .update_mdx(db_name, report_id, mdx, tiptap_mdx)
            .await
            .context("Failed to update report markup")?;
        if !updated {
            return Err(ReportServiceError::NotFound);
        }
        Ok(())
    }

    async fn fetch(
        &self,
        db_name: &str,
        report_id: i64,
    ) -> Result<crate::models::Report, ReportServiceError> {
        self.repo
            .get(db_name, report_id)
            .await
            .context("Failed to get report")?
            .ok_or(ReportServiceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxReportRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateReportInput, UNKNOWN_ANALYSIS_ID};
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;

    async fn setup_test_service() -> ReportService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ReportService::new(
            SqlxReportRepository::boxed(pool),
            Arc::new(ReportTasks::new()),
        )
    }

    async fn create_report(service: &ReportService, input: CreateReportInput) -> i64 {
        service
            .repo
            .create(&input)
            .await
            .expect("Failed to create report")
            .report_id
    }

    fn step(function_name: &str, result: Value) -> ThinkingStep {
        serde_json::from_value(json!({"function_name": function_name, "result": result}))
            .unwrap()
    }

    fn summary(report_id: i64, status: &str) -> ReportSummary {
        ReportSummary {
            report_id,
            report_name: None,
            status: ReportStatus::from(status),
            created_ts: Utc::now(),
            inputs: Value::Null,
        }
    }

    #[test]
    fn test_merge_analyses_drops_sql_steps() {
        let analyses = vec![json!({"analysis_id": "a-1", "sql": "SELECT 1"})];
        let steps = vec![
            step("text_to_sql_tool", json!({"analysis_id": "a-1"})),
            step("pdf_citations_tool", json!({"analysis_id": "a-2", "answer": "..."})),
        ];

        let merged = merge_analyses(analyses, steps);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["sql"], json!("SELECT 1"));
        assert_eq!(merged[1]["function_name"], json!("pdf_citations_tool"));
        assert_eq!(merged[1]["analysis_id"], json!("a-2"));
    }

    #[test]
    fn test_merge_analyses_non_mapping_result_is_unknown() {
        let steps = vec![
            step("think_tool", json!("just some text")),
            step("web_search_tool", json!({"answer": "no id here"})),
        ];

        let merged = merge_analyses(Vec::new(), steps);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["analysis_id"], json!(UNKNOWN_ANALYSIS_ID));
        assert_eq!(merged[1]["analysis_id"], json!(UNKNOWN_ANALYSIS_ID));
    }

    #[test]
    fn test_visible_reports_filters_revisions() {
        let reports = vec![
            summary(3, "done"),
            summary(2, "Revision: before edits"),
            summary(1, "Revision in progress: shorter intro"),
        ];

        let visible = visible_reports(reports);
        let ids: Vec<i64> = visible.iter().map(|r| r.report_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(visible[1].status.is_being_revised());
    }

    #[tokio::test]
    async fn test_list_reports_hides_revisions() {
        let service = setup_test_service().await;
        for status in ["done", "Revision: v1", "Revision in progress: v2"] {
            create_report(
                &service,
                CreateReportInput {
                    db_name: "sales".to_string(),
                    status: ReportStatus::from(status),
                    ..Default::default()
                },
            )
            .await;
        }

        let listed = service.list_reports("sales").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| !r.status.is_revision()));
    }

    #[tokio::test]
    async fn test_delete_report_cancels_task() {
        let service = setup_test_service().await;
        let id = create_report(
            &service,
            CreateReportInput {
                db_name: "sales".to_string(),
                status: ReportStatus::Thinking,
                ..Default::default()
            },
        )
        .await;
        let handle = service
            .tasks()
            .spawn("sales", id, async {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            })
            .await;

        service.delete_report("sales", id).await.unwrap();

        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(matches!(
            service.get_status("sales", id).await,
            Err(ReportServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_report_is_not_found() {
        let service = setup_test_service().await;
        let result = service.delete_report("sales", 42).await;
        assert!(matches!(result, Err(ReportServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_analysis_by_id() {
        let service = setup_test_service().await;
        let id = create_report(
            &service,
            CreateReportInput {
                db_name: "sales".to_string(),
                analyses: vec![json!({"analysis_id": "a-1", "question": "Revenue?"})],
                thinking_steps: vec![step("think_tool", json!({"analysis_id": "t-1"}))],
                ..Default::default()
            },
        )
        .await;

        let analysis = service.get_analysis("sales", id, "a-1").await.unwrap();
        assert_eq!(analysis["question"], json!("Revenue?"));

        let thought = service.get_analysis("sales", id, "t-1").await.unwrap();
        assert_eq!(thought["function_name"], json!("think_tool"));

        let missing = service.get_analysis("sales", id, "zzz").await;
        assert!(matches!(missing, Err(ReportServiceError::AnalysisNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_mdx_requires_a_field() {
        let service = setup_test_service().await;
        let result = service.update_mdx("sales", 1, None, None).await;
        assert!(matches!(result, Err(ReportServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_comments_round_trip() {
        let service = setup_test_service().await;
        let id = create_report(
            &service,
            CreateReportInput {
                db_name: "sales".to_string(),
                ..Default::default()
            },
        )
        .await;
        let comments = vec![json!({"text": "Looks good"}), json!("plain string")];

        service.update_comments("sales", id, &comments).await.unwrap();
        assert_eq!(service.get_comments("sales", id).await.unwrap(), comments);

        service.update_comments("sales", id, &[]).await.unwrap();
        assert!(service.get_comments("sales", id).await.unwrap().is_empty());
    }

    fn status_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("done".to_string()),
            Just("thinking".to_string()),
            "[a-z ]{0,12}".prop_map(|s| format!("Revision: {}", s)),
            "[a-z ]{0,12}".prop_map(|s| format!("Revision in progress: {}", s)),
            "[A-Za-z ]{0,12}",
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_listing_never_contains_revisions(
            statuses in prop::collection::vec(status_strategy(), 0..20)
        ) {
            let reports: Vec<ReportSummary> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| summary(i as i64, s))
                .collect();
            let expected: Vec<i64> = statuses
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.starts_with("Revision: "))
                .map(|(i, _)| i as i64)
                .collect();

            let visible = visible_reports(reports);

            prop_assert!(visible.iter().all(|r| !r.status.to_string().starts_with("Revision: ")));
            let ids: Vec<i64> = visible.iter().map(|r| r.report_id).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
