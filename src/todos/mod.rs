//! Todos — data model, partial-update decoding, and REST routes.

pub mod model;
pub mod patch;
pub mod routes;

pub use model::Todo;
pub use patch::{PatchField, TodoPatch};
pub use routes::{TodoState, todo_routes};
