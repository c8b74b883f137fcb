/*!
 * Database module for persistent storage of batch reports.
 *
 * This module provides SQLite-based persistence for:
 * - Batch report headers with their status counts
 * - Per-item results and per-stage results
 */

pub mod schema;
pub mod connection;
pub mod repository;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::{BatchSummaryRecord, ReportRepository};
