//! Report generation pipeline schemas
//!
//! Data shapes exchanged with the report generation tools. The tools
//! themselves run outside this service; these types only describe their
//! inputs and outputs so stored thinking steps and analyses can be decoded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionInput {
    /// The question to answer
    pub question: String,
}

/// Input of the text-to-SQL tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionFromDatabaseInput {
    pub question: String,
    /// Database whose DDL and instructions drive SQL generation
    pub db_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionViaPdfCitationsInput {
    pub question: String,
    /// Ids of the PDFs to cite
    pub pdf_files: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkToolInput {
    /// The task to think about
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkToolOutput {
    pub answer: String,
    pub reasoning: String,
}

/// Output of the text-to-SQL tool
///
/// `analysis_id` is what report text cites. `rows` holds the result frame
/// serialized as a JSON string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionFromDatabaseOutput {
    #[serde(default)]
    pub analysis_id: Option<String>,
    pub question: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Option<String>,
    #[serde(default)]
    pub df_truncated: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnswerQuestionFromDatabaseOutput {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Decode `rows` into JSON records. `None` when absent or malformed.
    pub fn parsed_rows(&self) -> Option<Vec<Map<String, Value>>> {
        self.rows
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

fn default_num_reports() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportFromQuestionInput {
    pub report_id: String,
    pub question: String,
    /// Model used for SQL generation
    pub model: String,
    pub db_name: String,
    /// User answers to clarifying questions asked after the initial question
    #[serde(default)]
    pub clarification_responses: String,
    #[serde(default = "default_num_reports")]
    pub num_reports: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportFromQuestionOutput {
    pub report: String,
    pub report_with_citations: Vec<Map<String, Value>>,
    pub sql_answers: Vec<AnswerQuestionFromDatabaseOutput>,
    pub tool_outputs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportWithAgentsInput {
    #[serde(flatten)]
    pub base: GenerateReportFromQuestionInput,
    /// PDFs available for citation
    #[serde(default)]
    pub pdf_file_ids: Vec<i64>,
    #[serde(default)]
    pub use_websearch: bool,
}

/// Verdict of the evaluator agent on whether the report needs more research
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorAgentOutput {
    pub further_research_needed: bool,
    pub explanation: String,
    /// Empty unless `further_research_needed`
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReportOpenAIAgentsOutput {
    pub final_report: String,
    pub n_tool_calls: u32,
    pub intermediate_tool_calls: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeReportFromQuestionsOutput {
    pub synthesized_report: String,
    pub report_answers: Vec<GenerateReportFromQuestionOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_report_input_defaults() {
        let input: GenerateReportFromQuestionInput = serde_json::from_value(json!({
            "report_id": "17",
            "question": "Which regions grew fastest?",
            "model": "o3-mini",
            "db_name": "sales"
        }))
        .unwrap();

        assert_eq!(input.clarification_responses, "");
        assert_eq!(input.num_reports, 1);
    }

    #[test]
    fn test_agents_input_flattens_base_fields() {
        let input: GenerateReportWithAgentsInput = serde_json::from_value(json!({
            "report_id": "17",
            "question": "Which regions grew fastest?",
            "model": "o3-mini",
            "db_name": "sales",
            "num_reports": 3,
            "pdf_file_ids": [4, 5]
        }))
        .unwrap();

        assert_eq!(input.base.db_name, "sales");
        assert_eq!(input.base.num_reports, 3);
        assert_eq!(input.pdf_file_ids, vec![4, 5]);
        assert!(!input.use_websearch);
    }

    #[test]
    fn test_sql_answer_accepts_null_fields() {
        let answer: AnswerQuestionFromDatabaseOutput = serde_json::from_value(json!({
            "question": null,
            "analysis_id": "a-1"
        }))
        .unwrap();
        assert_eq!(answer.analysis_id.as_deref(), Some("a-1"));
        assert!(answer.question.is_none());
        assert!(!answer.is_error());
    }

    #[test]
    fn test_sql_answer_parsed_rows() {
        let answer = AnswerQuestionFromDatabaseOutput {
            question: Some("How many orders?".to_string()),
            columns: Some(vec!["count".to_string()]),
            rows: Some(r#"[{"count": 12}]"#.to_string()),
            ..Default::default()
        };
        let rows = answer.parsed_rows().expect("rows should decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("count"), Some(&json!(12)));

        let broken = AnswerQuestionFromDatabaseOutput {
            rows: Some("not json".to_string()),
            ..Default::default()
        };
        assert!(broken.parsed_rows().is_none());
    }

    #[test]
    fn test_synthesized_output_nests_reports() {
        let output: SynthesizeReportFromQuestionsOutput = serde_json::from_value(json!({
            "synthesized_report": "# Summary",
            "report_answers": [{
                "report": "partial",
                "report_with_citations": [{"text": "Sales rose", "citations": ["a-1"]}],
                "sql_answers": [{"question": "q", "analysis_id": "a-1"}],
                "tool_outputs": []
            }]
        }))
        .unwrap();

        assert_eq!(output.report_answers.len(), 1);
        assert_eq!(
            output.report_answers[0].sql_answers[0].analysis_id.as_deref(),
            Some("a-1")
        );
    }
}
