/*!
 * Repository layer for batch report persistence.
 *
 * This module provides a high-level API over the report tables,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use super::connection::DatabaseConnection;
use crate::pipeline::report::{BatchItemResult, BatchReport, ItemStatus, StageResult, StageStatus};
use crate::pipeline::report_store::ReportStore;

/// Report header row, without items
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummaryRecord {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub total_items: usize,
    pub successful: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Repository for batch reports
#[derive(Clone)]
pub struct ReportRepository {
    /// Database connection
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Insert a report with all its items and stage results in one transaction
    pub async fn insert_report(&self, report: &BatchReport) -> Result<()> {
        let report = report.clone();

        self.db
            .transaction_async(move |tx| {
                tx.execute(
                    r#"
                    INSERT INTO batch_reports (id, created_at, total_items, successful, failed, cancelled)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        report.batch_id,
                        report.timestamp.to_rfc3339(),
                        report.total_items as i64,
                        report.successful as i64,
                        report.failed as i64,
                        report.cancelled as i64,
                    ],
                )?;

                for item in &report.items {
                    tx.execute(
                        r#"
                        INSERT INTO batch_items (
                            report_id, item_id, item_index, source, overall_status, error, final_output
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        "#,
                        params![
                            report.batch_id,
                            item.item_id,
                            item.index as i64,
                            item.source,
                            item.overall_status.as_str(),
                            item.error,
                            item.final_output,
                        ],
                    )?;
                    let batch_item_id = tx.last_insert_rowid();

                    for (position, stage) in item.per_stage.iter().enumerate() {
                        tx.execute(
                            r#"
                            INSERT INTO stage_results (
                                batch_item_id, position, stage_name, status, error, output_ref
                            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                            "#,
                            params![
                                batch_item_id,
                                position as i64,
                                stage.stage_name,
                                stage.status.as_str(),
                                stage.error,
                                stage.output_ref,
                            ],
                        )?;
                    }
                }

                debug!("Stored batch report {} ({} items)", report.batch_id, report.items.len());
                Ok(())
            })
            .await
    }

    /// Get a full report by batch id
    pub async fn get_report(&self, batch_id: &str) -> Result<Option<BatchReport>> {
        let batch_id = batch_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_report_sync(conn, &batch_id))
            .await
    }

    fn get_report_sync(conn: &Connection, batch_id: &str) -> Result<Option<BatchReport>> {
        let Some(summary) = conn
            .query_row(
                r#"
                SELECT id, created_at, total_items, successful, failed, cancelled
                FROM batch_reports WHERE id = ?1
                "#,
                [batch_id],
                parse_summary_row,
            )
            .optional()?
        else {
            return Ok(None);
        };
        let summary = summary?;

        let mut item_stmt = conn.prepare(
            r#"
            SELECT id, item_id, item_index, source, overall_status, error, final_output
            FROM batch_items WHERE report_id = ?1
            ORDER BY item_index
            "#,
        )?;
        let mut stage_stmt = conn.prepare(
            r#"
            SELECT stage_name, status, error, output_ref
            FROM stage_results WHERE batch_item_id = ?1
            ORDER BY position
            "#,
        )?;

        let rows = item_stmt
            .query_map([batch_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (row_id, item_id, index, source, status, error, final_output) in rows {
            let per_stage = stage_stmt
                .query_map([row_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .into_iter()
                .map(|(stage_name, status, error, output_ref)| {
                    Ok(StageResult {
                        status: StageStatus::parse(&status)
                            .ok_or_else(|| anyhow!("Unknown stage status '{}'", status))?,
                        stage_name,
                        error,
                        output_ref,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            items.push(BatchItemResult {
                overall_status: ItemStatus::parse(&status)
                    .ok_or_else(|| anyhow!("Unknown item status '{}'", status))?,
                item_id,
                index: index as usize,
                source,
                error,
                per_stage,
                final_output,
            });
        }

        Ok(Some(BatchReport {
            batch_id: summary.batch_id,
            timestamp: summary.created_at,
            total_items: summary.total_items,
            successful: summary.successful,
            failed: summary.failed,
            cancelled: summary.cancelled,
            items,
        }))
    }

    /// List report headers, newest first
    pub async fn list_reports(&self, limit: usize) -> Result<Vec<BatchSummaryRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, created_at, total_items, successful, failed, cancelled
                    FROM batch_reports
                    ORDER BY created_at DESC
                    LIMIT ?1
                    "#,
                )?;

                stmt.query_map([limit as i64], parse_summary_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
                    .into_iter()
                    .collect::<Result<Vec<_>>>()
            })
            .await
    }

    /// Delete a report and its items
    pub async fn delete_report(&self, batch_id: &str) -> Result<bool> {
        let batch_id = batch_id.to_string();

        self.db
            .execute_async(move |conn| {
                // Items and stage results go with it through ON DELETE CASCADE
                let deleted = conn.execute("DELETE FROM batch_reports WHERE id = ?1", [&batch_id])?;
                Ok(deleted > 0)
            })
            .await
    }
}

/// Map a report header row; the timestamp is parsed outside rusqlite's error type
fn parse_summary_row(row: &rusqlite::Row) -> rusqlite::Result<Result<BatchSummaryRecord>> {
    let batch_id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let total_items: i64 = row.get(2)?;
    let successful: i64 = row.get(3)?;
    let failed: i64 = row.get(4)?;
    let cancelled: i64 = row.get(5)?;

    Ok(DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("Invalid report timestamp '{}'", created_at))
        .map(|created_at| BatchSummaryRecord {
            batch_id,
            created_at: created_at.with_timezone(&Utc),
            total_items: total_items as usize,
            successful: successful as usize,
            failed: failed as usize,
            cancelled: cancelled as usize,
        }))
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn save(&self, report: &BatchReport) -> Result<()> {
        self.insert_report(report).await
    }

    async fn load(&self, batch_id: &str) -> Result<Option<BatchReport>> {
        self.get_report(batch_id).await
    }
}
