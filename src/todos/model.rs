//! Todo data model.

use serde::{Deserialize, Deserializer, Serialize};

/// A single to-do item.
///
/// `id` is chosen by the caller and is the primary key. Fields missing from
/// an incoming body, or sent as `null`, decode to their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Todo {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub completed: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Todo {
    /// Create a todo that is not yet completed.
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            completed: false,
        }
    }

    /// Builder: set completed.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}
