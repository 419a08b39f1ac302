/*
 *  Copyright 2025-2026 Taskmill Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Atomic task claiming.
//!
//! Claiming must hand each task to at most one concurrent caller. Both
//! backends run the candidate selection and the state transition as one
//! indivisible unit:
//!
//! - PostgreSQL uses a single statement with a `FOR UPDATE SKIP LOCKED`
//!   CTE, so concurrent claimers contending on the same candidate row
//!   never block each other and never double-claim.
//! - SQLite wraps select-then-update in an immediate transaction, which
//!   takes the write lock up front and serializes claimers.
//!
//! Candidates are pending tasks plus claimed tasks whose `claimed_at` is
//! older than the staleness threshold (abandoned claims). Sorting is
//! restricted to an allow-list of columns; the sort fragment is built from
//! fixed strings, never from caller input.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::task::TaskDAL;
use crate::database::schema::{task_types, tasks};
use crate::database::BackendType;
use crate::error::TaskQueueError;
use crate::models::{Task, TaskStatus};

/// Columns a claim may sort candidates by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Priority,
    Id,
    Attempts,
}

impl SortField {
    /// Parses a caller-supplied sort field. Anything outside the
    /// allow-list is rejected with `None`, never passed to the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(SortField::CreatedAt),
            "priority" => Some(SortField::Priority),
            "id" => Some(SortField::Id),
            "attempts" => Some(SortField::Attempts),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Priority => "priority",
            SortField::Id => "id",
            SortField::Attempts => "attempts",
        }
    }
}

/// Sort direction for claim candidate ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses a caller-supplied sort direction (`ASC` or `DESC` only).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ASC" => Some(SortOrder::Asc),
            "DESC" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(feature = "postgres")]
#[derive(QueryableByName)]
struct ClaimedId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
}

impl TaskDAL<'_> {
    /// Atomically claims the best available task for a worker.
    ///
    /// Candidates are restricted to `type_id`, optionally narrowed by a
    /// SQL LIKE pattern on the type name. Ties in the sort key break by
    /// lowest id so repeated polling makes deterministic progress.
    /// Returns `Ok(None)` when no candidate is available.
    #[allow(clippy::too_many_arguments)]
    pub async fn claim_one(
        &self,
        type_id: i64,
        type_pattern: Option<String>,
        sort: SortField,
        order: SortOrder,
        worker_id: &str,
        staleness_threshold: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Option<Task>, TaskQueueError> {
        let worker_id = worker_id.to_string();
        let pattern = type_pattern.unwrap_or_else(|| "%".to_string());

        match self.dal.backend() {
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let conn = self
                    .dal
                    .database
                    .get_postgres_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| {
                    claim_postgres(
                        conn,
                        type_id,
                        &pattern,
                        sort,
                        order,
                        &worker_id,
                        staleness_threshold,
                        now,
                    )
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let conn = self
                    .dal
                    .database
                    .get_sqlite_connection()
                    .await
                    .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?;
                conn.interact(move |conn| {
                    conn.immediate_transaction(|conn| {
                        claim_sqlite(
                            conn,
                            type_id,
                            &pattern,
                            sort,
                            order,
                            &worker_id,
                            staleness_threshold,
                            now,
                        )
                    })
                })
                .await
                .map_err(|e| TaskQueueError::ConnectionPool(e.to_string()))?
            }
        }
    }
}

/// Single-statement claim: the CTE locks the candidate row with
/// `FOR UPDATE SKIP LOCKED` and the enclosing UPDATE transitions it,
/// so select and transition commit together.
#[cfg(feature = "postgres")]
#[allow(clippy::too_many_arguments)]
fn claim_postgres(
    conn: &mut diesel::PgConnection,
    type_id: i64,
    pattern: &str,
    sort: SortField,
    order: SortOrder,
    worker_id: &str,
    staleness_threshold: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<Option<Task>, TaskQueueError> {
    use diesel::sql_types::{BigInt, Text, Timestamp};

    // Sort column and direction come from the enums above, never from
    // caller-supplied strings.
    let statement = format!(
        "WITH candidate AS ( \
             SELECT id FROM tasks \
             WHERE task_type_id = $1 \
               AND (status = 'pending' OR (status = 'claimed' AND claimed_at < $2)) \
               AND task_type_id IN (SELECT id FROM task_types WHERE name LIKE $3) \
             ORDER BY {} {}, id ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) \
         UPDATE tasks SET \
             status = 'claimed', \
             claimed_by = $4, \
             claimed_at = $5, \
             attempts = attempts + 1, \
             progress = 0, \
             updated_at = $5 \
         FROM candidate \
         WHERE tasks.id = candidate.id \
         RETURNING tasks.id",
        sort.as_sql(),
        order.as_sql()
    );

    let claimed: Vec<ClaimedId> = diesel::sql_query(statement)
        .bind::<BigInt, _>(type_id)
        .bind::<Timestamp, _>(staleness_threshold)
        .bind::<Text, _>(pattern)
        .bind::<Text, _>(worker_id)
        .bind::<Timestamp, _>(now)
        .get_results(conn)?;

    match claimed.first() {
        None => Ok(None),
        Some(row) => {
            let task = tasks::table
                .find(row.id)
                .select(Task::as_select())
                .first(conn)?;
            Ok(Some(task))
        }
    }
}

#[cfg(feature = "sqlite")]
#[allow(clippy::too_many_arguments)]
fn claim_sqlite(
    conn: &mut diesel::SqliteConnection,
    type_id: i64,
    pattern: &str,
    sort: SortField,
    order: SortOrder,
    worker_id: &str,
    staleness_threshold: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<Option<Task>, TaskQueueError> {
    let mut candidate = tasks::table
        .filter(tasks::task_type_id.eq(type_id))
        .filter(
            tasks::status.eq(TaskStatus::Pending.as_str()).or(tasks::status
                .eq(TaskStatus::Claimed.as_str())
                .and(tasks::claimed_at.lt(staleness_threshold))),
        )
        .filter(
            tasks::task_type_id.eq_any(
                task_types::table
                    .filter(task_types::name.like(pattern.to_string()))
                    .select(task_types::id),
            ),
        )
        .select(tasks::id)
        .into_boxed();

    candidate = match (sort, order) {
        (SortField::CreatedAt, SortOrder::Asc) => {
            candidate.order((tasks::created_at.asc(), tasks::id.asc()))
        }
        (SortField::CreatedAt, SortOrder::Desc) => {
            candidate.order((tasks::created_at.desc(), tasks::id.asc()))
        }
        (SortField::Priority, SortOrder::Asc) => {
            candidate.order((tasks::priority.asc(), tasks::id.asc()))
        }
        (SortField::Priority, SortOrder::Desc) => {
            candidate.order((tasks::priority.desc(), tasks::id.asc()))
        }
        (SortField::Id, SortOrder::Asc) => candidate.order(tasks::id.asc()),
        (SortField::Id, SortOrder::Desc) => candidate.order(tasks::id.desc()),
        (SortField::Attempts, SortOrder::Asc) => {
            candidate.order((tasks::attempts.asc(), tasks::id.asc()))
        }
        (SortField::Attempts, SortOrder::Desc) => {
            candidate.order((tasks::attempts.desc(), tasks::id.asc()))
        }
    };

    let best: Option<i64> = candidate.limit(1).first(conn).optional()?;

    match best {
        None => Ok(None),
        Some(id) => {
            diesel::update(tasks::table.find(id))
                .set((
                    tasks::status.eq(TaskStatus::Claimed.as_str()),
                    tasks::claimed_by.eq(worker_id),
                    tasks::claimed_at.eq(now),
                    tasks::attempts.eq(tasks::attempts + 1),
                    tasks::progress.eq(0),
                    tasks::updated_at.eq(now),
                ))
                .execute(conn)?;

            let task = tasks::table.find(id).select(Task::as_select()).first(conn)?;
            Ok(Some(task))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_allow_list() {
        assert_eq!(SortField::parse("created_at"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("priority"), Some(SortField::Priority));
        assert_eq!(SortField::parse("id"), Some(SortField::Id));
        assert_eq!(SortField::parse("attempts"), Some(SortField::Attempts));

        assert_eq!(SortField::parse("status"), None);
        assert_eq!(SortField::parse("priority; DROP TABLE tasks"), None);
        assert_eq!(SortField::parse(""), None);
    }

    #[test]
    fn sort_order_accepts_only_asc_desc() {
        assert_eq!(SortOrder::parse("ASC"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("asc"), None);
        assert_eq!(SortOrder::parse("DESC; --"), None);
    }

    #[test]
    fn sql_fragments_are_fixed_strings() {
        assert_eq!(SortField::CreatedAt.as_sql(), "created_at");
        assert_eq!(SortField::Attempts.as_sql(), "attempts");
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
        assert_eq!(SortOrder::Desc.as_sql(), "DESC");
    }
}
