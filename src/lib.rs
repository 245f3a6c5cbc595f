//! Oracle report management service
//!
//! HTTP endpoints for listing, reading, editing and deleting generated
//! reports, plus the data contracts of the report generation pipeline.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
