//! Request bodies shared by the report endpoints
//!
//! Every body carries `db_name` and `token`; the token is consumed by the
//! `Authorized` extractor before these types are decoded.

use serde::Deserialize;
use serde_json::Value;

/// Identifies the caller and the database
#[derive(Debug, Clone, Deserialize)]
pub struct BasicRequest {
    pub db_name: String,
    pub token: String,
}

/// Identifies the report to be accessed or modified
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    #[serde(flatten)]
    pub base: BasicRequest,
    pub report_id: i64,
}

impl ReportRequest {
    pub fn db_name(&self) -> &str {
        &self.base.db_name
    }
}

/// Identifies one analysis within a report
#[derive(Debug, Clone, Deserialize)]
pub struct ReportAnalysisRequest {
    #[serde(flatten)]
    pub report: ReportRequest,
    pub analysis_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReportCommentsRequest {
    #[serde(flatten)]
    pub report: ReportRequest,
    pub comments: Vec<Value>,
}

/// Updates the generated markup, the user-edited markup, or both.
///
/// The generated version is kept separately for export and revisions.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReportMdxRequest {
    #[serde(flatten)]
    pub report: ReportRequest,
    #[serde(default)]
    pub mdx: Option<String>,
    #[serde(default)]
    pub tiptap_mdx: Option<String>,
}
