//! Persistence layer — libSQL-backed storage for todos.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlTodoStore;
pub use traits::TodoStore;
