//! Report management endpoints
//!
//! All endpoints are POST with a JSON body carrying `db_name` and `token`.

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};

use crate::api::common::{
    BasicRequest, ReportAnalysisRequest, ReportRequest, UpdateReportCommentsRequest,
    UpdateReportMdxRequest,
};
use crate::api::middleware::{ApiError, AppState, Authorized};
use crate::api::responses::{
    AnalysisIdsResponse, AnalysisResponse, CommentsResponse, MessageResponse, ReportListEntry,
    ReportListResponse, ReportMdxResponse, StatusResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list_reports", post(list_reports))
        .route("/delete_report", post(delete_report))
        .route("/get_report_mdx", post(get_report_mdx))
        .route("/update_report_mdx", post(update_report_mdx))
        .route("/get_report_analysis", post(get_report_analysis))
        .route("/get_report_analysis_ids", post(get_report_analysis_ids))
        .route("/get_report_status", post(get_report_status))
        .route("/get_report_comments", post(get_report_comments))
        .route("/update_report_comments", post(update_report_comments))
}

/// List the reports of a database, newest first
async fn list_reports(
    State(state): State<AppState>,
    Authorized(req): Authorized<BasicRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state.report_service.list_reports(&req.db_name).await?;
    Ok(Json(ReportListResponse {
        reports: reports.into_iter().map(ReportListEntry::from).collect(),
    }))
}

async fn delete_report(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .report_service
        .delete_report(req.db_name(), req.report_id)
        .await?;
    Ok(Json(MessageResponse::new("Report deleted")))
}

/// Report markup with the merged analyses list
async fn get_report_mdx(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .report_service
        .get_content(req.db_name(), req.report_id)
        .await?;
    Ok(Json(ReportMdxResponse::from(content)))
}

async fn update_report_mdx(
    State(state): State<AppState>,
    Authorized(req): Authorized<UpdateReportMdxRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .report_service
        .update_mdx(
            req.report.db_name(),
            req.report.report_id,
            req.mdx.as_deref(),
            req.tiptap_mdx.as_deref(),
        )
        .await?;
    Ok(Json(MessageResponse::new("MDX updated")))
}

async fn get_report_analysis(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportAnalysisRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let analysis = state
        .report_service
        .get_analysis(req.report.db_name(), req.report.report_id, &req.analysis_id)
        .await?;
    Ok(Json(AnalysisResponse { analysis }))
}

async fn get_report_analysis_ids(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let analyses = state
        .report_service
        .get_analysis_ids(req.db_name(), req.report_id)
        .await?;
    Ok(Json(AnalysisIdsResponse { analyses }))
}

async fn get_report_status(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .report_service
        .get_status(req.db_name(), req.report_id)
        .await?;
    Ok(Json(StatusResponse { status }))
}

async fn get_report_comments(
    State(state): State<AppState>,
    Authorized(req): Authorized<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .report_service
        .get_comments(req.db_name(), req.report_id)
        .await?;
    Ok(Json(CommentsResponse { comments }))
}

async fn update_report_comments(
    State(state): State<AppState>,
    Authorized(req): Authorized<UpdateReportCommentsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .report_service
        .update_comments(req.report.db_name(), req.report.report_id, &req.comments)
        .await?;
    Ok(Json(MessageResponse::new("Comments updated")))
}
