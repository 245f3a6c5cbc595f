//! Response bodies of the report endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ReportStatus, ReportSummary};
use crate::services::ReportContent;

/// One row of the report listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportListEntry {
    pub report_id: i64,
    pub report_name: Option<String>,
    pub status: ReportStatus,
    pub is_revision: bool,
    pub is_being_revised: bool,
    /// RFC 3339 creation time
    pub date_created: String,
    pub inputs: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportListEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMdxResponse {
    pub mdx: Option<String>,
    pub analyses: Vec<Value>,
    pub report_with_citations: Vec<Value>,
    pub inputs: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisIdsResponse {
    pub analyses: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ReportStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ReportSummary> for ReportListEntry {
    fn from(report: ReportSummary) -> Self {
        Self {
            report_id: report.report_id,
            report_name: report.report_name,
            is_revision: report.status.is_revision(),
            is_being_revised: report.status.is_being_revised(),
            status: report.status,
            date_created: report.created_ts.to_rfc3339(),
            inputs: report.inputs,
        }
    }
}

impl From<ReportContent> for ReportMdxResponse {
    fn from(content: ReportContent) -> Self {
        Self {
            mdx: content.mdx,
            analyses: content.analyses,
            report_with_citations: content.report_with_citations,
            inputs: content.inputs,
        }
    }
}
