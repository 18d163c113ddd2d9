//! Bulk ingestion and paged reads of task result rows.

use crate::error::{DatabaseError, WriteError};
use crate::types::{Measurement, ObjectIdentifier, ProviderId, TaskId};
use crate::{Error, Result};

use super::{Database, MeasurementRow};

// SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999.
// Identifier rows bind 3 variables, measurement rows bind 6.
const MAX_IDENTIFIERS_PER_INSERT: usize = 333;
const MAX_MEASUREMENTS_PER_INSERT: usize = 166;

/// Classify an insert failure: a foreign key violation means the parent task
/// was deleted underneath the writer.
fn classify_write_error(task_id: TaskId, what: &str, e: sqlx::Error) -> WriteError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_foreign_key_violation()
    {
        return WriteError::TaskGone(task_id);
    }
    WriteError::Storage(DatabaseError::QueryFailed(format!(
        "Failed to insert {}: {}",
        what, e
    )))
}

impl Database {
    /// Append identifier rows for a task as one atomic write
    ///
    /// Chunked to stay within SQLite's bind variable limit; all chunks share a
    /// transaction so either every row lands or none does.
    pub async fn insert_identifiers(
        &self,
        task_id: TaskId,
        rows: &[ObjectIdentifier],
    ) -> std::result::Result<(), WriteError> {
        if rows.is_empty() {
            return Ok(());
        }

        let payloads = rows
            .iter()
            .map(|row| serde_json::to_string(row).map(|json| (row.provider_id.as_str(), json)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                WriteError::Storage(DatabaseError::QueryFailed(format!(
                    "Failed to encode identifier payload: {}",
                    e
                )))
            })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_write_error(task_id, "identifiers", e))?;

        for chunk in payloads.chunks(MAX_IDENTIFIERS_PER_INSERT) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO identifier_results (task_id, provider_id, payload) ",
            );

            query_builder.push_values(chunk, |mut b, (provider_id, payload)| {
                b.push_bind(task_id)
                    .push_bind(*provider_id)
                    .push_bind(payload.as_str());
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| classify_write_error(task_id, "identifiers", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| classify_write_error(task_id, "identifiers", e))?;

        Ok(())
    }

    /// Append measurement rows for a task as one atomic write
    pub async fn insert_measurements(
        &self,
        task_id: TaskId,
        rows: &[Measurement],
    ) -> std::result::Result<(), WriteError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_write_error(task_id, "measurements", e))?;

        for chunk in rows.chunks(MAX_MEASUREMENTS_PER_INSERT) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO measurement_results (task_id, provider_id, julian_date, magnitude, magnitude_error, light_filter) ",
            );

            query_builder.push_values(chunk, |mut b, m| {
                b.push_bind(task_id)
                    .push_bind(m.provider_id.as_str())
                    .push_bind(m.julian_date)
                    .push_bind(m.magnitude)
                    .push_bind(m.magnitude_error)
                    .push_bind(m.light_filter.as_deref());
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| classify_write_error(task_id, "measurements", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| classify_write_error(task_id, "measurements", e))?;

        Ok(())
    }

    /// Count identifier rows of a task
    pub async fn count_identifiers(&self, task_id: TaskId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM identifier_results WHERE task_id = ?")
                .bind(task_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count identifiers: {}",
                        e
                    )))
                })?;

        Ok(count)
    }

    /// Count measurement rows of a task
    pub async fn count_measurements(&self, task_id: TaskId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM measurement_results WHERE task_id = ?")
                .bind(task_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count measurements: {}",
                        e
                    )))
                })?;

        Ok(count)
    }

    /// List identifier rows of a task in insertion order
    pub async fn list_identifiers(
        &self,
        task_id: TaskId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ObjectIdentifier>> {
        let payloads: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT payload FROM identifier_results
            WHERE task_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(task_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list identifiers: {}",
                e
            )))
        })?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(Error::from))
            .collect()
    }

    /// List measurement rows of a task in insertion order
    pub async fn list_measurements(
        &self,
        task_id: TaskId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MeasurementRow>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT id, task_id, provider_id, julian_date, magnitude, magnitude_error, light_filter
            FROM measurement_results
            WHERE task_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(task_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list measurements: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Read the next page of a task's measurements after row `after_id`
    ///
    /// Keyset pagination, so concurrent inserts never shift a page.
    pub async fn measurements_after(
        &self,
        task_id: TaskId,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<MeasurementRow>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(
            r#"
            SELECT id, task_id, provider_id, julian_date, magnitude, magnitude_error, light_filter
            FROM measurement_results
            WHERE task_id = ? AND id > ?
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(task_id)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to page measurements: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Provider of the first measurement row of a task, if it has any
    pub async fn first_measurement_provider(&self, task_id: TaskId) -> Result<Option<ProviderId>> {
        let provider: Option<String> = sqlx::query_scalar(
            r#"
            SELECT provider_id FROM measurement_results
            WHERE task_id = ?
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find measurement provider: {}",
                e
            )))
        })?;

        Ok(provider.map(ProviderId))
    }

    /// Distinct non-null light filters among a task's measurements, sorted
    pub async fn distinct_light_filters(&self, task_id: TaskId) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT light_filter FROM measurement_results
            WHERE task_id = ? AND light_filter IS NOT NULL
            ORDER BY light_filter ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list light filters: {}",
                e
            )))
        })
    }
}
