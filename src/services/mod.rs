//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - Report projections, filtering and updates
//! - Token validation
//! - Tracking of in-progress generation tasks

pub mod auth;
pub mod report;
pub mod tasks;

pub use auth::{SqlxTokenValidator, TokenValidator};
pub use report::{merge_analyses, visible_reports, ReportContent, ReportService, ReportServiceError};
pub use tasks::ReportTasks;
