//! Report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status prefix carried by revision snapshots
pub const REVISION_PREFIX: &str = "Revision: ";

/// Status prefix carried by reports that are currently being revised
pub const REVISION_IN_PROGRESS_PREFIX: &str = "Revision in progress: ";

/// Thinking steps produced by this tool are already present as analyses
pub const TEXT_TO_SQL_TOOL: &str = "text_to_sql_tool";

/// Analysis id assigned to steps whose result carries none
pub const UNKNOWN_ANALYSIS_ID: &str = "unknown";

/// Report status
///
/// Stored as a plain string. Revisions are encoded as prefixes on top of a
/// free-form description, so unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    #[default]
    Initialized,
    Thinking,
    Done,
    Error,
    /// A historical snapshot of another report
    Revision(String),
    /// A report whose revision is being generated
    RevisionInProgress(String),
    Other(String),
}

impl ReportStatus {
    pub fn is_revision(&self) -> bool {
        matches!(self, Self::Revision(_))
    }

    pub fn is_being_revised(&self) -> bool {
        matches!(self, Self::RevisionInProgress(_))
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "initialized"),
            Self::Thinking => write!(f, "thinking"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
            Self::Revision(rest) => write!(f, "{}{}", REVISION_PREFIX, rest),
            Self::RevisionInProgress(rest) => write!(f, "{}{}", REVISION_IN_PROGRESS_PREFIX, rest),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for ReportStatus {
    fn from(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix(REVISION_PREFIX) {
            return Self::Revision(rest.to_string());
        }
        if let Some(rest) = s.strip_prefix(REVISION_IN_PROGRESS_PREFIX) {
            return Self::RevisionInProgress(rest.to_string());
        }
        match s {
            "initialized" => Self::Initialized,
            "thinking" => Self::Thinking,
            "done" => Self::Done,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ReportStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ReportStatus> for String {
    fn from(status: ReportStatus) -> Self {
        status.to_string()
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A recorded intermediate action taken while generating a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub function_name: String,
    #[serde(default)]
    pub result: Value,
    /// Set when the step is merged into a report's analyses list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<Value>,
    /// Tool inputs, call ids and anything else the pipeline recorded
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThinkingStep {
    pub fn is_sql_answer(&self) -> bool {
        self.function_name == TEXT_TO_SQL_TOOL
    }

    /// The analysis id recorded in the step result.
    ///
    /// Falls back to [`UNKNOWN_ANALYSIS_ID`] when the result is not a JSON
    /// object or has no `analysis_id` key.
    pub fn result_analysis_id(&self) -> String {
        match self.result.as_object().and_then(|m| m.get("analysis_id")) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => UNKNOWN_ANALYSIS_ID.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Report entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_id: i64,
    pub db_name: String,
    pub report_name: Option<String>,
    pub status: ReportStatus,
    pub created_ts: DateTime<Utc>,
    pub inputs: Value,
    pub mdx: Option<String>,
    pub tiptap_mdx: Option<String>,
    pub analyses: Vec<Value>,
    /// As stored by the pipeline, normally strings
    pub analysis_ids: Vec<Value>,
    pub thinking_steps: Vec<ThinkingStep>,
    pub report_content_with_citations: Vec<Value>,
    pub comments: Vec<Value>,
}

/// Listing projection of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: i64,
    pub report_name: Option<String>,
    pub status: ReportStatus,
    pub created_ts: DateTime<Utc>,
    pub inputs: Value,
}

/// Input for creating a report
///
/// Written by the generation pipeline when a report is requested.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReportInput {
    pub db_name: String,
    #[serde(default)]
    pub report_name: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub created_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub mdx: Option<String>,
    #[serde(default)]
    pub analyses: Vec<Value>,
    #[serde(default)]
    pub analysis_ids: Vec<String>,
    #[serde(default)]
    pub thinking_steps: Vec<ThinkingStep>,
    #[serde(default)]
    pub report_content_with_citations: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_status_parses_known_values() {
        assert_eq!(ReportStatus::from("done"), ReportStatus::Done);
        assert_eq!(ReportStatus::from("thinking"), ReportStatus::Thinking);
        assert_eq!(
            ReportStatus::from("Revision: initial draft"),
            ReportStatus::Revision("initial draft".to_string())
        );
        assert_eq!(
            ReportStatus::from("Revision in progress: tightening summary"),
            ReportStatus::RevisionInProgress("tightening summary".to_string())
        );
        assert_eq!(
            ReportStatus::from("Generating report"),
            ReportStatus::Other("Generating report".to_string())
        );
    }

    #[test]
    fn test_revision_flags() {
        let revision = ReportStatus::from("Revision: v1");
        assert!(revision.is_revision());
        assert!(!revision.is_being_revised());

        let in_progress = ReportStatus::from("Revision in progress: v2");
        assert!(!in_progress.is_revision());
        assert!(in_progress.is_being_revised());

        assert!(!ReportStatus::Done.is_revision());
        assert!(!ReportStatus::Done.is_being_revised());
    }

    #[test]
    fn test_status_serializes_as_string() {
        let status = ReportStatus::RevisionInProgress("x".to_string());
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("Revision in progress: x"));

        let parsed: ReportStatus = serde_json::from_value(json!("error")).unwrap();
        assert_eq!(parsed, ReportStatus::Error);
    }

    #[test]
    fn test_thinking_step_preserves_extra_keys() {
        let raw = json!({
            "function_name": "pdf_citations_tool",
            "inputs": {"question": "Why?"},
            "result": {"analysis_id": "a-1", "answer": "Because"},
            "tool_call_id": "call_9"
        });
        let step: ThinkingStep = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(step.function_name, "pdf_citations_tool");
        assert_eq!(step.extra.get("tool_call_id"), Some(&json!("call_9")));
        assert_eq!(serde_json::to_value(&step).unwrap(), raw);
    }

    #[test]
    fn test_result_analysis_id() {
        let mut step = ThinkingStep {
            function_name: "think_tool".to_string(),
            result: json!({"analysis_id": "abc"}),
            analysis_id: None,
            extra: Map::new(),
        };
        assert_eq!(step.result_analysis_id(), "abc");

        step.result = json!({"answer": "no id"});
        assert_eq!(step.result_analysis_id(), UNKNOWN_ANALYSIS_ID);

        step.result = json!("plain text result");
        assert_eq!(step.result_analysis_id(), UNKNOWN_ANALYSIS_ID);

        step.result = json!({"analysis_id": 42});
        assert_eq!(step.result_analysis_id(), "42");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_status_string_round_trip(raw in "[A-Za-z :]{0,40}") {
            let status = ReportStatus::from(raw.as_str());
            prop_assert_eq!(status.to_string(), raw);
        }

        #[test]
        fn property_revision_prefix_detected(rest in "[a-z ]{0,20}") {
            let status = ReportStatus::from(format!("{}{}", REVISION_PREFIX, rest));
            prop_assert!(status.is_revision());
            prop_assert!(!status.is_being_revised());
        }
    }
}
