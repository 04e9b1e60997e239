//! libSQL backend — async `TodoStore` implementation.
//!
//! Supports local file and in-memory databases. A single connection is
//! shared by all requests; the engine serializes concurrent writers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::traits::TodoStore;
use crate::todos::model::Todo;
use crate::todos::patch::TodoPatch;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    completed BOOLEAN NOT NULL DEFAULT 0
)";

const INSERT_OR_REPLACE: &str =
    "INSERT OR REPLACE INTO todos (id, title, description, completed) VALUES (?1, ?2, ?3, ?4)";

const SELECT_ONE: &str = "SELECT id, title, description, completed FROM todos WHERE id = ?1";

const SELECT_ALL: &str = "SELECT id, title, description, completed FROM todos";

const DELETE_ONE: &str = "DELETE FROM todos WHERE id = ?1";

/// libSQL todo store.
pub struct LibSqlTodoStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlTodoStore {
    /// Open (or create) a local database file and ensure the schema exists.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the `todos` table if it does not exist yet.
    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(CREATE_TABLE, ())
            .await
            .map_err(|e| StoreError::Query(format!("init_schema: {e}")))?;
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a row to a Todo. Column order: id, title, description, completed.
fn row_to_todo(row: &libsql::Row) -> Result<Todo, StoreError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("todo.id: {e}")))?;
    let title: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("todo.title: {e}")))?;
    let description: String = row
        .get(2)
        .map_err(|e| StoreError::Query(format!("todo.description: {e}")))?;
    let completed: i64 = row
        .get(3)
        .map_err(|e| StoreError::Query(format!("todo.completed: {e}")))?;

    Ok(Todo {
        id,
        title,
        description,
        completed: completed != 0,
    })
}

/// Build the UPDATE for a patch, touching only the fields it carries.
///
/// Returns `None` when there is nothing to set.
fn patch_statement(patch: &TodoPatch) -> Option<(String, Vec<libsql::Value>)> {
    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<libsql::Value> = Vec::new();

    if let Some(title) = patch.title.clone().into_update() {
        values.push(libsql::Value::Text(title));
        assignments.push(format!("title = ?{}", values.len()));
    }
    if let Some(description) = patch.description.clone().into_update() {
        values.push(libsql::Value::Text(description));
        assignments.push(format!("description = ?{}", values.len()));
    }
    if let Some(completed) = patch.completed.clone().into_update() {
        values.push(libsql::Value::Integer(completed as i64));
        assignments.push(format!("completed = ?{}", values.len()));
    }

    if values.is_empty() {
        return None;
    }

    values.push(libsql::Value::Integer(patch.id));
    let sql = format!(
        "UPDATE todos SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );
    Some((sql, values))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl TodoStore for LibSqlTodoStore {
    async fn insert_or_replace(&self, todo: &Todo) -> Result<(), StoreError> {
        self.conn
            .execute(
                INSERT_OR_REPLACE,
                params![
                    todo.id,
                    todo.title.as_str(),
                    todo.description.as_str(),
                    todo.completed as i64,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert_or_replace: {e}")))?;
        debug!(id = todo.id, "Todo written");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Todo, StoreError> {
        let mut rows = self
            .conn
            .query(SELECT_ONE, params![id])
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_todo(&row),
            Ok(None) => Err(StoreError::NotFound { id }),
            Err(e) => Err(StoreError::Query(format!("get row: {e}"))),
        }
    }

    async fn get_all(&self) -> Result<Vec<Todo>, StoreError> {
        let mut rows = self
            .conn
            .query(SELECT_ALL, ())
            .await
            .map_err(|e| StoreError::Query(format!("get_all: {e}")))?;

        let mut todos = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get_all row: {e}")))?
        {
            todos.push(row_to_todo(&row)?);
        }
        Ok(todos)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let count = self
            .conn
            .execute(DELETE_ONE, params![id])
            .await
            .map_err(|e| StoreError::Query(format!("delete: {e}")))?;
        debug!(id, deleted = count, "Todo deleted");
        Ok(())
    }

    async fn patch(&self, patch: &TodoPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Err(StoreError::NoFieldsToUpdate);
        }
        let (sql, values) = patch_statement(patch).ok_or(StoreError::NoFieldsToUpdate)?;

        let count = self
            .conn
            .execute(&sql, libsql::params::Params::Positional(values))
            .await
            .map_err(|e| StoreError::Query(format!("patch: {e}")))?;
        debug!(id = patch.id, updated = count, "Todo patched");
        Ok(())
    }
}
