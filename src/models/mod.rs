//! Data models
//!
//! - The stored `Report` entity and its status and thinking-step types
//! - Schemas of the external report generation pipeline

pub mod analysis;
mod report;

pub use analysis::{
    AnswerQuestionFromDatabaseInput, AnswerQuestionFromDatabaseOutput, AnswerQuestionInput,
    AnswerQuestionViaPdfCitationsInput, EvaluatorAgentOutput, GenerateReportFromQuestionInput,
    GenerateReportFromQuestionOutput, GenerateReportOpenAIAgentsOutput,
    GenerateReportWithAgentsInput, SynthesizeReportFromQuestionsOutput, ThinkToolInput,
    ThinkToolOutput,
};
pub use report::{
    CreateReportInput, Report, ReportStatus, ReportSummary, ThinkingStep,
    REVISION_IN_PROGRESS_PREFIX, REVISION_PREFIX, TEXT_TO_SQL_TOOL, UNKNOWN_ANALYSIS_ID,
};
