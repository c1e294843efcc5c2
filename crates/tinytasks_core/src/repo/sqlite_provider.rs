//! SQLite-backed persistence provider.
//!
//! # Responsibility
//! - Commit task list/task change sets in one immediate transaction.
//! - Provide sorted, filtered retrieval for lists and per-list tasks.
//!
//! # Invariants
//! - Lists are returned `sort_order ASC, last_changed DESC, list_uuid ASC`.
//! - Tasks are returned `sort_order ASC, task_uuid ASC` within one list.
//! - Deleting a list row cascades to its task rows (`ON DELETE CASCADE`).

use crate::db::migrations::latest_version;
use crate::model::task::Task;
use crate::model::task_list::{TaskList, TaskListId};
use crate::repo::provider::{
    ChangeSet, PersistenceError, PersistenceProvider, PersistenceResult, Snapshot,
};
use log::{debug, error};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

const LIST_SELECT_SQL: &str = "SELECT
    list_uuid,
    title,
    sort_order,
    last_changed
FROM task_lists";

const TASK_SELECT_SQL: &str = "SELECT
    task_uuid,
    list_uuid,
    text,
    is_done,
    sort_order
FROM tasks";

/// Durable provider over a migrated SQLite connection.
pub struct SqliteProvider<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProvider<'conn> {
    /// Creates provider from a connection returned by `open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: &'conn Connection) -> PersistenceResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Lists every task list in display order.
    pub fn fetch_task_lists(&self) -> PersistenceResult<Vec<TaskList>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIST_SELECT_SQL}
             ORDER BY sort_order ASC, last_changed DESC, list_uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_task_list_row(row)?);
        }
        Ok(lists)
    }

    /// Lists tasks owned by one list, in order.
    pub fn fetch_tasks(&self, list_id: TaskListId) -> PersistenceResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE list_uuid = ?1
             ORDER BY sort_order ASC, task_uuid ASC;"
        ))?;
        let mut rows = stmt.query([list_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn fetch_all_tasks(&self) -> PersistenceResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             ORDER BY list_uuid ASC, sort_order ASC, task_uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

impl PersistenceProvider for SqliteProvider<'_> {
    fn load(&self) -> PersistenceResult<Snapshot> {
        Ok(Snapshot {
            lists: self.fetch_task_lists()?,
            tasks: self.fetch_all_tasks()?,
        })
    }

    fn commit(&mut self, changes: &ChangeSet) -> PersistenceResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        match apply_change_set(self.conn, changes) {
            Ok(()) => {
                debug!(
                    "event=store_commit module=repo status=ok provider=sqlite writes={} duration_ms={}",
                    changes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_commit module=repo status=error provider=sqlite writes={} duration_ms={} error={}",
                    changes.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn apply_change_set(conn: &Connection, changes: &ChangeSet) -> PersistenceResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    for task_id in &changes.deleted_tasks {
        tx.execute("DELETE FROM tasks WHERE task_uuid = ?1;", [task_id.to_string()])?;
    }
    for list_id in &changes.deleted_lists {
        tx.execute(
            "DELETE FROM task_lists WHERE list_uuid = ?1;",
            [list_id.to_string()],
        )?;
    }

    for list in &changes.upserted_lists {
        tx.execute(
            "INSERT INTO task_lists (
                list_uuid,
                title,
                sort_order,
                last_changed
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(list_uuid) DO UPDATE SET
                title = excluded.title,
                sort_order = excluded.sort_order,
                last_changed = excluded.last_changed;",
            params![
                list.id.to_string(),
                list.title.as_deref(),
                list.order,
                list.last_changed,
            ],
        )?;
    }

    for task in &changes.upserted_tasks {
        tx.execute(
            "INSERT INTO tasks (
                task_uuid,
                list_uuid,
                text,
                is_done,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(task_uuid) DO UPDATE SET
                list_uuid = excluded.list_uuid,
                text = excluded.text,
                is_done = excluded.is_done,
                sort_order = excluded.sort_order,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                task.id.to_string(),
                task.list_id.to_string(),
                task.text.as_str(),
                bool_to_int(task.is_done),
                task.order,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn parse_task_list_row(row: &Row<'_>) -> PersistenceResult<TaskList> {
    let id_text: String = row.get("list_uuid")?;
    Ok(TaskList {
        id: parse_uuid(&id_text, "task_lists.list_uuid")?,
        title: row.get("title")?,
        order: row.get("sort_order")?,
        last_changed: row.get("last_changed")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> PersistenceResult<Task> {
    let id_text: String = row.get("task_uuid")?;
    let list_text: String = row.get("list_uuid")?;

    let is_done = match row.get::<_, i64>("is_done")? {
        0 => false,
        1 => true,
        other => {
            return Err(PersistenceError::InvalidData(format!(
                "invalid is_done value `{other}` in tasks.is_done"
            )));
        }
    };

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.task_uuid")?,
        list_id: parse_uuid(&list_text, "tasks.list_uuid")?,
        text: row.get("text")?,
        is_done,
        order: row.get("sort_order")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> PersistenceResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| PersistenceError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> PersistenceResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PersistenceError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["task_lists", "tasks"] {
        if !table_exists(conn, table)? {
            return Err(PersistenceError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> PersistenceResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
