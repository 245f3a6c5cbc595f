//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod report;
pub mod user;

pub use report::{ReportRepository, SqlxReportRepository};
pub use user::{SqlxUserRepository, UserRepository};
