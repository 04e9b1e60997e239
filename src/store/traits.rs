//! `TodoStore` trait — the async interface the HTTP layer persists through.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::todos::model::Todo;
use crate::todos::patch::TodoPatch;

/// Backend-agnostic storage for todos.
///
/// Every operation is a single statement. Callers get owned values back.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Write the row at `todo.id`, replacing any existing row in full.
    async fn insert_or_replace(&self, todo: &Todo) -> Result<(), StoreError>;

    /// Get a todo by id. Fails with [`StoreError::NotFound`] if absent.
    async fn get(&self, id: i64) -> Result<Todo, StoreError>;

    /// All todos, in no particular order. Empty when the table is empty.
    async fn get_all(&self) -> Result<Vec<Todo>, StoreError>;

    /// Remove a todo. Deleting an unknown id succeeds.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Apply a partial update.
    ///
    /// Fails with [`StoreError::NoFieldsToUpdate`] before touching the
    /// database when the patch carries no fields. Patching an unknown id
    /// succeeds and changes nothing.
    async fn patch(&self, patch: &TodoPatch) -> Result<(), StoreError>;
}
